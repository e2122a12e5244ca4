use std::collections::HashMap;

use tracing::{debug, warn};

use crate::model::{ArticleSpec, MatchResult, PageRange, SkippedArticle};

use super::{SegmentError, normalize};

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum BoundaryMode {
    /// The first invalid range aborts the run.
    Strict,
    /// Invalid ranges are reported and the article is skipped.
    #[default]
    BestEffort,
}

impl BoundaryMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::BestEffort => "best_effort",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedArticle {
    pub article: ArticleSpec,
    pub range: PageRange,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoundaryReport {
    pub resolved: Vec<ResolvedArticle>,
    pub skipped: Vec<SkippedArticle>,
}

/// Turns article start pages into inclusive page ranges, in article order.
///
/// `pages` holds the prefix-stripped normalized text of every page and is
/// only consulted when `ends_with` bounds the last article.
pub fn resolve_boundaries(
    articles: &[ArticleSpec],
    matches: &[MatchResult],
    pages: &[String],
    ends_with: Option<&str>,
    mode: BoundaryMode,
) -> Result<BoundaryReport, SegmentError> {
    let total_pages = pages.len();
    let start_pages = matches
        .iter()
        .map(|found| (found.article.order, found.start_page))
        .collect::<HashMap<usize, usize>>();

    let mut report = BoundaryReport::default();

    for (index, article) in articles.iter().enumerate() {
        let Some(&start_page) = start_pages.get(&article.order) else {
            warn!(title = %article.title, "article not found in document");
            report.skipped.push(SkippedArticle {
                title: article.title.clone(),
                reason: "title not found on any page".to_string(),
            });
            continue;
        };

        let end_page = match articles.get(index + 1) {
            Some(next) => match start_pages.get(&next.order) {
                Some(&next_start) => next_start.saturating_sub(1),
                None => total_pages,
            },
            None => match ends_with {
                Some(marker) => find_end_marker(pages, marker, start_page)
                    .map(|marker_page| marker_page - 1)
                    .unwrap_or(total_pages),
                None => total_pages,
            },
        };

        if start_page < 1 || start_page > end_page || end_page > total_pages {
            let error = SegmentError::InvalidRange {
                title: article.title.clone(),
                start_page,
                end_page,
                total_pages,
            };
            if mode == BoundaryMode::Strict {
                return Err(error);
            }
            warn!(%error, "skipping article");
            report.skipped.push(SkippedArticle {
                title: article.title.clone(),
                reason: error.to_string(),
            });
            continue;
        }

        let range = PageRange::new(start_page, end_page);
        if let Some(previous) = report
            .resolved
            .iter()
            .find(|previous| previous.range.overlaps(&range))
        {
            warn!(
                title = %article.title,
                range = %range,
                other = %previous.article.title,
                other_range = %previous.range,
                "article range overlaps an earlier article"
            );
        }

        debug!(title = %article.title, range = %range, "resolved article range");
        report.resolved.push(ResolvedArticle {
            article: article.clone(),
            range,
        });
    }

    Ok(report)
}

/// First page at or after `start_page` whose text begins with the marker.
fn find_end_marker(pages: &[String], marker: &str, start_page: usize) -> Option<usize> {
    let marker = normalize(marker);
    if marker.is_empty() {
        warn!("end marker is empty after normalization; ignoring it");
        return None;
    }

    let found = pages
        .iter()
        .enumerate()
        .skip(start_page.saturating_sub(1))
        .find(|(_, page)| normalize(page).starts_with(&marker))
        .map(|(index, _)| index + 1);

    match found {
        Some(page) => debug!(page, marker = %marker, "found end marker"),
        None => debug!(marker = %marker, "end marker not found; using last page"),
    }

    found
}
