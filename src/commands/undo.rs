use std::path::PathBuf;

use anyhow::Result;

use crate::backup::restore;

#[derive(Debug, Clone)]
pub struct UndoSettings {
    pub file: PathBuf,
    pub backup_root: PathBuf,
}

/// Returns the snapshot that was put back in place.
pub fn run(settings: &UndoSettings) -> Result<PathBuf> {
    restore(&settings.file, &settings.backup_root)
}
