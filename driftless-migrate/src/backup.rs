//! Pre-migration backups of file-backed databases.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::connection::SqlExecutor;
use crate::error::{MigrateResult, MigrationError};

/// Backup file name: `<stem>.backup-<yyyymmddHHMMSS>.<ext>`, placed in
/// `dir` or next to the database.
pub fn backup_path(database: &Path, dir: Option<&Path>, at: DateTime<Utc>) -> PathBuf {
    let stem = database
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "database".to_string());
    let stamp = at.format("%Y%m%d%H%M%S");
    let name = match database.extension() {
        Some(ext) => format!("{}.backup-{}.{}", stem, stamp, ext.to_string_lossy()),
        None => format!("{}.backup-{}", stem, stamp),
    };

    let parent = dir
        .map(Path::to_path_buf)
        .or_else(|| database.parent().map(Path::to_path_buf))
        .unwrap_or_default();
    parent.join(name)
}

/// Copy the database file before a destructive run. Returns `None` for
/// databases that are not file-backed.
pub async fn backup_database(
    conn: &dyn SqlExecutor,
    dir: Option<&Path>,
) -> MigrateResult<Option<PathBuf>> {
    let Some(database) = conn.database_file() else {
        debug!(provider = %conn.provider(), "Database is not file-backed, skipping backup");
        return Ok(None);
    };

    let target = backup_path(&database, dir, Utc::now());
    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| MigrationError::backup(format!("{}: {}", parent.display(), e)))?;
    }
    tokio::fs::copy(&database, &target)
        .await
        .map_err(|e| MigrationError::backup(format!("{}: {}", database.display(), e)))?;

    info!(from = %database.display(), to = %target.display(), "Backed up database");
    Ok(Some(target))
}
