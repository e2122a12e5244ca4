use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};
use tracing::debug;

/// Every file below `backup_root`, at any depth.
pub fn list_backup_files(backup_root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    collect_files(backup_root, &mut files)?;
    Ok(files)
}

fn collect_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))?;

    for entry in entries {
        let entry = entry.with_context(|| format!("failed to read entry in {}", dir.display()))?;
        let path = entry.path();
        let file_type = entry
            .file_type()
            .with_context(|| format!("failed to inspect file type: {}", path.display()))?;

        if file_type.is_dir() {
            collect_files(&path, files)?;
        } else if file_type.is_file() {
            files.push(path);
        }
    }

    Ok(())
}

pub(super) fn modified_time(path: &Path) -> Result<SystemTime> {
    fs::metadata(path)
        .and_then(|metadata| metadata.modified())
        .with_context(|| format!("failed to read modification time: {}", path.display()))
}

/// Deletes the least recently modified files until at most `capacity` remain
/// across all snapshot directories. Returns how many files were removed.
pub fn enforce_retention(backup_root: &Path, capacity: usize) -> Result<usize> {
    let files = list_backup_files(backup_root)?;
    if files.len() <= capacity {
        return Ok(0);
    }

    let mut dated = files
        .into_iter()
        .map(|path| modified_time(&path).map(|modified| (modified, path)))
        .collect::<Result<Vec<(SystemTime, PathBuf)>>>()?;
    dated.sort();

    let excess = dated.len() - capacity;
    for (_, path) in dated.into_iter().take(excess) {
        fs::remove_file(&path)
            .with_context(|| format!("failed to delete old backup file: {}", path.display()))?;
        debug!(path = %path.display(), "evicted snapshot");
    }

    Ok(excess)
}
