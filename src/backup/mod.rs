use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result, bail};
use chrono::Local;
use tracing::info;

use crate::model::{BackupSnapshot, RetentionPolicy};
use crate::util::{copy_file, ensure_directory, ensure_file_exists, file_stem_string};

mod restore;
mod retention;

pub use restore::restore;
pub use retention::enforce_retention;
#[cfg(test)]
pub use retention::list_backup_files;

pub const SNAPSHOT_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupSettings {
    pub backup_root: PathBuf,
    pub policy: RetentionPolicy,
}

/// Directory holding every snapshot of `source`, keyed by its file stem.
pub fn snapshot_dir(source: &Path, backup_root: &Path) -> Result<PathBuf> {
    Ok(backup_root.join(file_stem_string(source)?))
}

/// Copies `source` into its snapshot directory, then applies the global
/// retention bound across the whole backup root. The capacity must leave room
/// for the new snapshot.
pub fn snapshot(source: &Path, settings: &BackupSettings) -> Result<BackupSnapshot> {
    if settings.policy.total_capacity == 0 {
        bail!("backup capacity must be at least 1 to keep the snapshot being taken");
    }
    ensure_file_exists(source)?;
    ensure_directory(&settings.backup_root)?;

    let stem = file_stem_string(source)?;
    let dir = settings.backup_root.join(&stem);
    ensure_directory(&dir)?;

    let timestamp = Local::now().format(SNAPSHOT_TIMESTAMP_FORMAT).to_string();
    let extension = source
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default();

    let mut path = dir.join(format!("{stem}_{timestamp}{extension}"));
    let mut counter = 1usize;
    while path.exists() {
        path = dir.join(format!("{stem}_{timestamp}_{counter}{extension}"));
        counter += 1;
    }

    copy_file(source, &path)?;
    // Recency is judged by mtime; a copy must not inherit the source's.
    File::options()
        .write(true)
        .open(&path)
        .and_then(|file| file.set_modified(SystemTime::now()))
        .with_context(|| format!("failed to stamp snapshot time: {}", path.display()))?;

    info!(source = %source.display(), snapshot = %path.display(), "created backup snapshot");

    let evicted = enforce_retention(&settings.backup_root, settings.policy.total_capacity)?;
    if evicted > 0 {
        info!(evicted, capacity = settings.policy.total_capacity, "evicted old snapshots");
    }

    Ok(BackupSnapshot {
        source_file_name: stem,
        timestamp,
        path,
    })
}

/// Removes `source` after snapshotting it.
pub fn delete_with_backup(source: &Path, settings: &BackupSettings) -> Result<BackupSnapshot> {
    let snapshot = snapshot(source, settings)?;
    fs::remove_file(source)
        .with_context(|| format!("failed to delete file: {}", source.display()))?;
    info!(path = %source.display(), "deleted file");
    Ok(snapshot)
}
