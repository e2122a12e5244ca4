use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use regex::Regex;
use tracing::{debug, info};

use crate::commands::extract::CONFIG_FILE_NAME;
use crate::model::{ArticleEntry, ArticlesConfig};
use crate::segment::normalize;
use crate::tools::PdfTools;
use crate::util::{ensure_directory, ensure_file_exists, write_yaml};

#[derive(Debug, Clone)]
pub struct ExtractIndexSettings {
    pub file: PathBuf,
    pub output_dir: PathBuf,
    pub tool_timeout: Duration,
}

/// Builds `config.yaml` from the document's table of contents.
pub fn run(settings: &ExtractIndexSettings, tools: &dyn PdfTools) -> Result<PathBuf> {
    ensure_file_exists(&settings.file)?;
    ensure_directory(&settings.output_dir)?;

    let (page, contents) = find_contents_page(tools, &settings.file)?;
    info!(page, "found contents page");

    let parser = ContentsParser::new()?;
    let articles = parser.parse(&contents);
    if articles.is_empty() {
        bail!("no numbered entries found on contents page {page}");
    }

    let config_path = settings.output_dir.join(CONFIG_FILE_NAME);
    write_yaml(&config_path, &ArticlesConfig { articles })?;
    info!(path = %config_path.display(), "wrote article configuration");

    Ok(config_path)
}

/// First page whose normalized text mentions "contents".
fn find_contents_page(tools: &dyn PdfTools, pdf_path: &Path) -> Result<(usize, String)> {
    let total_pages = tools.page_count(pdf_path)?;

    for page in 1..=total_pages {
        let text = tools.page_text(pdf_path, page).with_context(|| {
            format!("failed to extract page {page} of {}", pdf_path.display())
        })?;
        if normalize(&text).contains("contents") {
            return Ok((page, text));
        }
    }

    bail!("no contents page found in {}", pdf_path.display())
}

pub struct ContentsParser {
    entry_number: Regex,
    bare_number_or_range: Regex,
    trailing_number: Regex,
}

impl ContentsParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            entry_number: Regex::new(r"^\d+\.\s*").context("failed to compile entry regex")?,
            bare_number_or_range: Regex::new(r"^\d+(-\d+)?$")
                .context("failed to compile page number regex")?,
            trailing_number: Regex::new(r"\s*\d+$")
                .context("failed to compile trailing number regex")?,
        })
    }

    /// Numbered entries ("1. Title") start a new article. Continuation lines
    /// extend the title; the last line of a multi-line entry is the author.
    pub fn parse(&self, contents: &str) -> Vec<ArticleEntry> {
        let mut articles = Vec::new();
        let mut lines: Vec<String> = Vec::new();
        let mut found_entry = false;
        let mut expecting_title = false;

        for line in contents.lines().map(str::trim) {
            if line.is_empty() || self.bare_number_or_range.is_match(line) {
                continue;
            }

            if self.entry_number.is_match(line) {
                found_entry = true;
                if let Some(article) = self.finish_entry(&mut lines) {
                    articles.push(article);
                }

                let title = self.entry_number.replace(line, "");
                if title.is_empty() {
                    expecting_title = true;
                } else {
                    lines.push(title.into_owned());
                    expecting_title = false;
                }
            } else if expecting_title {
                lines.push(line.to_string());
                expecting_title = false;
            } else if found_entry {
                lines.push(line.to_string());
            }
        }

        if let Some(article) = self.finish_entry(&mut lines) {
            articles.push(article);
        }

        articles
    }

    fn finish_entry(&self, lines: &mut Vec<String>) -> Option<ArticleEntry> {
        if lines.is_empty() {
            return None;
        }

        let author = if lines.len() > 1 { lines.pop() } else { None };
        let joined = lines
            .drain(..)
            .map(|line| self.trim_trailing_number(&line))
            .collect::<Vec<String>>()
            .join(" ");
        let title = self.trim_trailing_number(joined.trim().trim_end_matches('.'));

        debug!(title = %title, author = ?author, "parsed contents entry");
        Some(ArticleEntry { title, author })
    }

    fn trim_trailing_number(&self, text: &str) -> String {
        self.trailing_number.replace(text, "").trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::tools::fake::FakePdfTools;

    const CONTENTS: &str = "\
Contents

1. Deep Learning for Crop
Yield Prediction 3
A. Smith and B. Jones
2.
Soil Moisture Mapping 15
C. Doe
17-20
3. Editorial Note 21
";

    #[test]
    fn parse_splits_titles_and_authors() {
        let parser = ContentsParser::new().expect("parser");
        let articles = parser.parse(CONTENTS);

        assert_eq!(
            articles,
            vec![
                ArticleEntry {
                    title: "Deep Learning for Crop Yield Prediction".to_string(),
                    author: Some("A. Smith and B. Jones".to_string()),
                },
                ArticleEntry {
                    title: "Soil Moisture Mapping".to_string(),
                    author: Some("C. Doe".to_string()),
                },
                ArticleEntry {
                    title: "Editorial Note".to_string(),
                    author: None,
                },
            ]
        );
    }

    #[test]
    fn parse_ignores_text_before_first_entry() {
        let parser = ContentsParser::new().expect("parser");
        let articles = parser.parse("Journal of Science\nVolume 4\n\n1. Only Entry.\n");

        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].title, "Only Entry");
        assert_eq!(articles[0].author, None);
    }

    #[test]
    fn run_writes_config_consumed_by_extract() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = dir.path().join("issue.pdf");
        fs::write(&source, "pdf").expect("write source");
        let tools = FakePdfTools::with_pages(&["Cover", CONTENTS, "Deep Learning for Crop"]);

        let config_path = run(
            &ExtractIndexSettings {
                file: source,
                output_dir: dir.path().join("configs"),
                tool_timeout: Duration::from_secs(5),
            },
            &tools,
        )
        .expect("extract index");

        let articles = crate::commands::extract::load_articles(&config_path).expect("articles");
        assert_eq!(articles.len(), 3);
        assert_eq!(articles[1].title, "Soil Moisture Mapping");
        assert_eq!(articles[2].author, None);
    }

    #[test]
    fn run_fails_without_contents_page() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = dir.path().join("issue.pdf");
        fs::write(&source, "pdf").expect("write source");
        let tools = FakePdfTools::with_pages(&["Cover", "Body"]);

        let result = run(
            &ExtractIndexSettings {
                file: source,
                output_dir: dir.path().join("configs"),
                tool_timeout: Duration::from_secs(5),
            },
            &tools,
        );
        assert!(result.is_err());
    }
}
