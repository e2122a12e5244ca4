use std::path::Path;

use anyhow::{Context, Result, bail};
use thiserror::Error;
use tracing::{debug, info};

use crate::model::{ArticleSpec, PageContent, SkippedArticle};
use crate::tools::PdfTools;

mod boundary;
mod extract;
mod matcher;
mod normalize;
mod prefix;

pub use boundary::{BoundaryMode, ResolvedArticle, resolve_boundaries};
pub use extract::extract_article;
pub use matcher::{MatchPolicy, find_start_pages};
pub use normalize::normalize;
pub use prefix::{find_common_prefix, remove_prefix};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SegmentError {
    #[error("document has no pages to segment")]
    EmptyDocument,

    #[error(
        "invalid page range for article '{title}' (start: {start_page}, end: {end_page}, total pages: {total_pages})"
    )]
    InvalidRange {
        title: String,
        start_page: usize,
        end_page: usize,
        total_pages: usize,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SegmentSettings {
    pub threshold: f64,
    pub match_policy: MatchPolicy,
    pub boundary_mode: BoundaryMode,
    pub ends_with: Option<String>,
}

impl Default for SegmentSettings {
    fn default() -> Self {
        Self {
            threshold: 0.6,
            match_policy: MatchPolicy::default(),
            boundary_mode: BoundaryMode::default(),
            ends_with: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segmentation {
    pub total_pages: usize,
    pub prefix: String,
    pub resolved: Vec<ResolvedArticle>,
    pub skipped: Vec<SkippedArticle>,
}

/// Reads the text of every page through the extraction tools. Any page failing
/// to extract aborts the pass, since prefix detection needs the whole document.
pub fn load_pages(tools: &dyn PdfTools, pdf_path: &Path) -> Result<Vec<PageContent>> {
    let total_pages = tools.page_count(pdf_path)?;
    if total_pages == 0 {
        bail!("document reports zero pages: {}", pdf_path.display());
    }

    let mut pages = Vec::with_capacity(total_pages);
    for page in 1..=total_pages {
        let raw_text = tools.page_text(pdf_path, page).with_context(|| {
            format!("failed to extract page {page} of {}", pdf_path.display())
        })?;
        let content = PageContent::new(page, raw_text);
        if content.normalized_text.is_empty() {
            debug!(
                page = content.index,
                raw_chars = content.raw_text.len(),
                "page has no text after normalization"
            );
        }
        pages.push(content);
    }

    debug!(path = %pdf_path.display(), total_pages, "loaded page text");
    Ok(pages)
}

pub fn segment_pages(
    pages: &[PageContent],
    articles: &[ArticleSpec],
    settings: &SegmentSettings,
) -> Result<Segmentation, SegmentError> {
    let normalized = pages
        .iter()
        .map(|page| page.normalized_text.clone())
        .collect::<Vec<String>>();

    let prefix = find_common_prefix(&normalized, settings.threshold)?;
    info!(prefix = %prefix, threshold = settings.threshold, "detected common page prefix");

    let stripped = remove_prefix(&normalized, &prefix);
    let matches = find_start_pages(&stripped, articles, settings.match_policy);
    info!(
        articles = articles.len(),
        matched = matches.len(),
        policy = settings.match_policy.as_str(),
        "matched article titles"
    );

    let report = resolve_boundaries(
        articles,
        &matches,
        &stripped,
        settings.ends_with.as_deref(),
        settings.boundary_mode,
    )?;

    Ok(Segmentation {
        total_pages: pages.len(),
        prefix,
        resolved: report.resolved,
        skipped: report.skipped,
    })
}

pub fn segment_document(
    tools: &dyn PdfTools,
    pdf_path: &Path,
    articles: &[ArticleSpec],
    settings: &SegmentSettings,
) -> Result<Segmentation> {
    let pages = load_pages(tools, pdf_path)?;
    let segmentation = segment_pages(&pages, articles, settings)?;
    Ok(segmentation)
}
