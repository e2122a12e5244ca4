use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::model::{ArticleSpec, PageRange};
use crate::tools::PdfTools;

/// Spaces become underscores; anything outside `[A-Za-z0-9_]` is dropped.
pub fn sanitize_file_name(title: &str) -> String {
    title
        .replace(' ', "_")
        .chars()
        .filter(|character| character.is_ascii_alphanumeric() || *character == '_')
        .collect()
}

pub fn output_path_for(article: &ArticleSpec, output_dir: &Path) -> PathBuf {
    let mut stem = sanitize_file_name(&article.title);
    if stem.is_empty() {
        stem = format!("article_{}", article.order + 1);
    }
    output_dir.join(format!("{stem}.pdf"))
}

pub fn extract_article(
    tools: &dyn PdfTools,
    source: &Path,
    article: &ArticleSpec,
    range: PageRange,
    output_dir: &Path,
) -> Result<PathBuf> {
    let output_path = output_path_for(article, output_dir);

    tools
        .materialize(source, &[range], &output_path)
        .with_context(|| {
            format!(
                "failed to extract pages {} for article '{}'",
                range, article.title
            )
        })?;

    info!(
        title = %article.title,
        start_page = range.start_page,
        end_page = range.end_page,
        output = %output_path.display(),
        "extracted article"
    );

    Ok(output_path)
}
