use std::path::PathBuf;

use anyhow::Result;
use tracing::info;

use crate::backup::{BackupSettings, delete_with_backup};
use crate::model::BackupSnapshot;
use crate::util::ensure_file_exists;

#[derive(Debug, Clone)]
pub struct DeleteSettings {
    pub file: PathBuf,
    pub backup: BackupSettings,
}

pub fn run(settings: &DeleteSettings) -> Result<BackupSnapshot> {
    ensure_file_exists(&settings.file)?;

    let snapshot = delete_with_backup(&settings.file, &settings.backup)?;
    info!(
        file = %settings.file.display(),
        source = %snapshot.source_file_name,
        timestamp = %snapshot.timestamp,
        snapshot = %snapshot.path.display(),
        "file deleted; restore with undo"
    );
    Ok(snapshot)
}
