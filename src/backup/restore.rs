use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::info;

use super::retention::modified_time;
use super::snapshot_dir;
use crate::util::copy_file;

/// Puts the newest snapshot of `source` back in place and deletes that
/// snapshot. Returns the snapshot path that was restored.
pub fn restore(source: &Path, backup_root: &Path) -> Result<PathBuf> {
    let dir = snapshot_dir(source, backup_root)?;
    if !dir.is_dir() {
        bail!("no backup directory for {}: {}", source.display(), dir.display());
    }

    let mut latest: Option<(std::time::SystemTime, PathBuf)> = None;
    let entries =
        fs::read_dir(&dir).with_context(|| format!("failed to read {}", dir.display()))?;
    for entry in entries {
        let entry = entry.with_context(|| format!("failed to read entry in {}", dir.display()))?;
        let path = entry.path();
        if !entry
            .file_type()
            .with_context(|| format!("failed to inspect file type: {}", path.display()))?
            .is_file()
        {
            continue;
        }

        let candidate = (modified_time(&path)?, path);
        if latest.as_ref().is_none_or(|current| candidate > *current) {
            latest = Some(candidate);
        }
    }

    let Some((_, snapshot)) = latest else {
        bail!("no backup files found for {}", source.display());
    };

    copy_file(&snapshot, source)?;
    fs::remove_file(&snapshot)
        .with_context(|| format!("failed to delete restored snapshot: {}", snapshot.display()))?;

    info!(
        path = %source.display(),
        snapshot = %snapshot.display(),
        "restored latest backup"
    );
    Ok(snapshot)
}
