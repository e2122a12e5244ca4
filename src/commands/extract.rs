use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::model::{
    ArticleSpec, ArticlesConfig, ExtractRunManifest, ExtractedArticle, PageRange, SkippedArticle,
};
use crate::segment::{SegmentSettings, extract_article, segment_document};
use crate::tools::PdfTools;
use crate::util::{
    ensure_directory, ensure_file_exists, now_utc_string, sha256_file, utc_compact_string,
    write_json_pretty,
};

pub const CONFIG_FILE_NAME: &str = "config.yaml";
pub const MANIFEST_FILE_NAME: &str = "extract_manifest.json";

#[derive(Debug, Clone)]
pub struct ExtractSettings {
    pub file: PathBuf,
    pub output_dir: PathBuf,
    pub config_path: PathBuf,
    pub segment: SegmentSettings,
    pub tool_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ExtractRangeSettings {
    pub file: PathBuf,
    pub output_dir: PathBuf,
    pub from: Option<usize>,
    pub to: Option<usize>,
    pub title: String,
    pub tool_timeout: Duration,
}

/// Accepts either the configuration file itself or a directory holding
/// `config.yaml`.
pub fn load_articles(config_path: &Path) -> Result<Vec<ArticleSpec>> {
    let path = if config_path.is_dir() {
        config_path.join(CONFIG_FILE_NAME)
    } else {
        config_path.to_path_buf()
    };
    ensure_file_exists(&path)?;

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let config: ArticlesConfig = serde_yaml::from_str(&raw)
        .with_context(|| format!("failed to parse {}", path.display()))?;

    let articles = config.into_specs();
    if articles.is_empty() {
        bail!("no articles listed in {}", path.display());
    }

    info!(path = %path.display(), articles = articles.len(), "loaded article configuration");
    Ok(articles)
}

pub fn run(settings: &ExtractSettings, tools: &dyn PdfTools) -> Result<ExtractRunManifest> {
    let started_ts = Utc::now();
    let run_id = format!("extract-{}", utc_compact_string(started_ts));

    ensure_file_exists(&settings.file)?;
    if !(0.0..=1.0).contains(&settings.segment.threshold) {
        bail!(
            "prefix threshold must be within [0, 1], got {}",
            settings.segment.threshold
        );
    }
    let articles = load_articles(&settings.config_path)?;
    ensure_directory(&settings.output_dir)?;

    info!(
        file = %settings.file.display(),
        output = %settings.output_dir.display(),
        run_id = %run_id,
        "starting article extraction"
    );

    let previous_outputs = previous_run_outputs(&settings.output_dir);
    let segmentation = segment_document(tools, &settings.file, &articles, &settings.segment)?;

    let mut extracted = Vec::with_capacity(segmentation.resolved.len());
    let mut skipped = segmentation.skipped.clone();
    let mut warnings = skipped
        .iter()
        .map(|entry| format!("{}: {}", entry.title, entry.reason))
        .collect::<Vec<String>>();

    for resolved in &segmentation.resolved {
        match extract_article(
            tools,
            &settings.file,
            &resolved.article,
            resolved.range,
            &settings.output_dir,
        ) {
            Ok(output_path) => extracted.push(ExtractedArticle {
                title: resolved.article.title.clone(),
                author: resolved.article.author.clone(),
                start_page: resolved.range.start_page,
                end_page: resolved.range.end_page,
                output_path: output_path.display().to_string(),
            }),
            Err(error) => {
                warn!(title = %resolved.article.title, error = %format!("{error:#}"), "article extraction failed");
                warnings.push(format!("{}: {error:#}", resolved.article.title));
                skipped.push(SkippedArticle {
                    title: resolved.article.title.clone(),
                    reason: format!("{error:#}"),
                });
            }
        }
    }

    let manifest = ExtractRunManifest {
        manifest_version: 1,
        run_id,
        generated_at: now_utc_string(),
        source_path: settings.file.display().to_string(),
        source_sha256: sha256_file(&settings.file)?,
        total_pages: segmentation.total_pages,
        detected_prefix: segmentation.prefix.clone(),
        threshold: settings.segment.threshold,
        match_policy: settings.segment.match_policy.as_str().to_string(),
        boundary_mode: settings.segment.boundary_mode.as_str().to_string(),
        ends_with: settings.segment.ends_with.clone(),
        articles: extracted,
        skipped,
        warnings,
    };

    remove_stale_outputs(settings, &previous_outputs, &manifest.articles);

    let manifest_path = settings.output_dir.join(MANIFEST_FILE_NAME);
    write_json_pretty(&manifest_path, &manifest)?;
    info!(path = %manifest_path.display(), "wrote extraction manifest");
    info!(
        extracted = manifest.articles.len(),
        skipped = manifest.skipped.len(),
        output = %settings.output_dir.display(),
        "article extraction completed"
    );

    Ok(manifest)
}

#[derive(Debug, Deserialize)]
struct PreviousManifest {
    #[serde(default)]
    articles: Vec<PreviousArticle>,
}

#[derive(Debug, Deserialize)]
struct PreviousArticle {
    output_path: String,
}

/// Article files listed by the manifest of an earlier run into `output_dir`.
/// A missing or unreadable manifest yields nothing.
fn previous_run_outputs(output_dir: &Path) -> Vec<PathBuf> {
    let manifest_path = output_dir.join(MANIFEST_FILE_NAME);
    let Ok(raw) = fs::read_to_string(&manifest_path) else {
        return Vec::new();
    };

    match serde_json::from_str::<PreviousManifest>(&raw) {
        Ok(previous) => previous
            .articles
            .into_iter()
            .map(|article| PathBuf::from(article.output_path))
            .collect(),
        Err(error) => {
            warn!(
                path = %manifest_path.display(),
                error = %error,
                "ignoring unreadable previous manifest"
            );
            Vec::new()
        }
    }
}

/// Deletes files from the previous run that this run did not write again.
/// Only direct children of the output directory are touched, and never the
/// source document.
fn remove_stale_outputs(
    settings: &ExtractSettings,
    previous_outputs: &[PathBuf],
    current: &[ExtractedArticle],
) {
    for stale in previous_outputs {
        let rewritten = current
            .iter()
            .any(|article| Path::new(&article.output_path) == stale.as_path());
        if rewritten
            || stale.parent() != Some(settings.output_dir.as_path())
            || stale == &settings.file
            || !stale.is_file()
        {
            continue;
        }

        match fs::remove_file(stale) {
            Ok(()) => debug!(path = %stale.display(), "removed output of previous run"),
            Err(error) => {
                warn!(path = %stale.display(), error = %error, "failed to remove stale output")
            }
        }
    }
}

/// Extracts one explicit page range under the given title. Missing bounds
/// default to the first and last page.
pub fn run_range(settings: &ExtractRangeSettings, tools: &dyn PdfTools) -> Result<PathBuf> {
    ensure_file_exists(&settings.file)?;
    if settings.title.trim().is_empty() {
        bail!("an article title is required when extracting an explicit page range");
    }

    let total_pages = tools.page_count(&settings.file)?;
    let start_page = settings.from.unwrap_or(1);
    let end_page = settings.to.unwrap_or(total_pages);
    if start_page < 1 || start_page > end_page || end_page > total_pages {
        bail!(
            "invalid page range for article '{}' (start: {}, end: {}, total pages: {})",
            settings.title,
            start_page,
            end_page,
            total_pages
        );
    }

    ensure_directory(&settings.output_dir)?;
    let article = ArticleSpec {
        title: settings.title.clone(),
        author: None,
        order: 0,
    };
    extract_article(
        tools,
        &settings.file,
        &article,
        PageRange::new(start_page, end_page),
        &settings.output_dir,
    )
}
