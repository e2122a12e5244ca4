use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Result, bail};
use tracing::{debug, info, warn};

use crate::backup::{BackupSettings, snapshot};
use crate::model::PageRange;
use crate::segment::normalize;
use crate::tools::{PdfTools, replace_with_pages};
use crate::util::ensure_file_exists;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageSelection {
    At(usize),
    Range { from: usize, to: Option<usize> },
    StartsWith { text: String, to: Option<usize> },
}

#[derive(Debug, Clone)]
pub struct DeletePagesSettings {
    pub file: PathBuf,
    pub selection: PageSelection,
    /// `None` skips the snapshot.
    pub backup: Option<BackupSettings>,
    pub tool_timeout: Duration,
}

/// Removes the selected pages in place and returns the range that was removed.
/// The selection is validated before the snapshot is taken, so bad input never
/// leaves a backup or a modified file behind.
pub fn run(settings: &DeletePagesSettings, tools: &dyn PdfTools) -> Result<PageRange> {
    ensure_file_exists(&settings.file)?;

    let total_pages = tools.page_count(&settings.file)?;
    let deletion = resolve_selection(tools, &settings.file, &settings.selection, total_pages)?;
    let keep = keep_ranges(total_pages, deletion);
    if keep.is_empty() {
        bail!(
            "refusing to delete every page of {}; use delete instead",
            settings.file.display()
        );
    }

    if let Some(backup) = &settings.backup {
        snapshot(&settings.file, backup)?;
    }

    replace_with_pages(tools, &settings.file, &keep)?;
    info!(
        file = %settings.file.display(),
        from = deletion.start_page,
        to = deletion.end_page,
        deleted = deletion.page_count(),
        "deleted pages"
    );

    Ok(deletion)
}

fn resolve_selection(
    tools: &dyn PdfTools,
    pdf_path: &Path,
    selection: &PageSelection,
    total_pages: usize,
) -> Result<PageRange> {
    match selection {
        PageSelection::At(page) => {
            if *page < 1 || *page > total_pages {
                bail!("invalid page number: {page} (total pages: {total_pages})");
            }
            Ok(PageRange::new(*page, *page))
        }
        PageSelection::Range { from, to } => {
            let to = to.unwrap_or(total_pages).min(total_pages);
            if *from < 1 || *from > total_pages || to < *from {
                bail!("invalid page range: from={from}, to={to}, total pages={total_pages}");
            }
            Ok(PageRange::new(*from, to))
        }
        PageSelection::StartsWith { text, to } => {
            let start = find_page_starting_with(tools, pdf_path, text, total_pages)?;
            let to = to.unwrap_or(total_pages).min(total_pages);
            if to < start {
                bail!("'to' ({to}) must not precede the page starting with the marker ({start})");
            }
            Ok(PageRange::new(start, to))
        }
    }
}

/// Pages whose text cannot be extracted are logged and skipped.
fn find_page_starting_with(
    tools: &dyn PdfTools,
    pdf_path: &Path,
    marker: &str,
    total_pages: usize,
) -> Result<usize> {
    let normalized_marker = normalize(marker);
    if normalized_marker.is_empty() {
        bail!("starts-with text is empty after normalization: '{marker}'");
    }

    for page in 1..=total_pages {
        let text = match tools.page_text(pdf_path, page) {
            Ok(text) => text,
            Err(error) => {
                warn!(page, error = %format!("{error:#}"), "failed to extract page; skipping");
                continue;
            }
        };

        if normalize(&text).starts_with(&normalized_marker) {
            debug!(page, marker = %normalized_marker, "found starts-with page");
            return Ok(page);
        }
    }

    bail!("no page starts with the specified text: '{marker}'")
}

/// Complement of `deletion` within `1..=total_pages`.
pub fn keep_ranges(total_pages: usize, deletion: PageRange) -> Vec<PageRange> {
    let mut keep = Vec::with_capacity(2);
    if deletion.start_page > 1 {
        keep.push(PageRange::new(1, deletion.start_page - 1));
    }
    if deletion.end_page < total_pages {
        keep.push(PageRange::new(deletion.end_page + 1, total_pages));
    }
    keep
}
