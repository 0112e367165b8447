use crate::core::progress::propagate;
use crate::db::log::ttlog;
use crate::db::sessions::{insert_session_row, query_details};
use crate::errors::{AppError, AppResult};
use crate::models::purge::{BACKUP_FORMAT_VERSION, BackupEntry, BackupSnapshot};
use crate::utils::path::backup_file_path;
use crate::utils::time::{format_ts, now};
use rusqlite::{Connection, ToSql, Transaction, TransactionBehavior};
use std::collections::BTreeSet;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::info;
use zip::ZipWriter;
use zip::write::FileOptions;

/// Where the snapshot taken before a purge goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupMode<'a> {
    Skip,
    /// Serialized snapshot handed back in the outcome only.
    Blob,
    /// Serialized and also written under `dir` before anything is deleted.
    File { dir: &'a Path, compress: bool },
}

impl From<bool> for BackupMode<'_> {
    fn from(with_backup: bool) -> Self {
        if with_backup {
            BackupMode::Blob
        } else {
            BackupMode::Skip
        }
    }
}

/// Sessions matching `filter` together with their display names.
pub fn collect_entries(
    conn: &Connection,
    filter: &str,
    params: &[&dyn ToSql],
) -> AppResult<Vec<BackupEntry>> {
    let mut entries: Vec<BackupEntry> = query_details(conn, filter, params)?
        .into_iter()
        .map(|d| BackupEntry {
            session: d.session,
            employee_name: d.employee_name,
            project_name: d.project_name,
            unit_description: d.unit_description,
        })
        .collect();
    entries.sort_by_key(|e| e.session.id);
    Ok(entries)
}

pub fn snapshot(scope: &str, entries: Vec<BackupEntry>) -> BackupSnapshot {
    BackupSnapshot {
        format_version: BACKUP_FORMAT_VERSION,
        created_at: format_ts(&now()),
        scope: scope.to_string(),
        entries,
    }
}

pub fn serialize(snapshot: &BackupSnapshot) -> AppResult<String> {
    serde_json::to_string_pretty(snapshot).map_err(|e| AppError::BackupFailure(e.to_string()))
}

/// Write a serialized snapshot under `dir`, zipped when `compress` is set.
pub fn write_snapshot(
    dir: &Path,
    scope: &str,
    serialized: &str,
    compress: bool,
) -> AppResult<PathBuf> {
    fs::create_dir_all(dir)?;

    let stamp = now().format("%Y%m%d_%H%M%S").to_string();
    let path = backup_file_path(dir, &stamp, scope);
    fs::write(&path, serialized)?;

    if !compress {
        return Ok(path);
    }

    let zipped = compress_backup(&path)?;
    fs::remove_file(&path)?;
    Ok(zipped)
}

/// Compress a backup using .zip
fn compress_backup(path: &Path) -> AppResult<PathBuf> {
    let zip_path = path.with_extension("zip");
    let file = fs::File::create(&zip_path)?;
    let mut zip = ZipWriter::new(file);

    let options: FileOptions<'_, ()> =
        FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "backup.json".to_string());

    let mut f = fs::File::open(path)?;
    zip.start_file(name, options).map_err(std::io::Error::other)?;

    std::io::copy(&mut f, &mut zip)?;
    zip.finish().map_err(std::io::Error::other)?;

    Ok(zip_path)
}

/// Load a snapshot written by [`write_snapshot`], zipped or not.
pub fn read_snapshot(path: &Path) -> AppResult<BackupSnapshot> {
    let content = if path.extension().is_some_and(|e| e == "zip") {
        let file = fs::File::open(path)?;
        let mut archive = zip::ZipArchive::new(file).map_err(std::io::Error::other)?;
        let mut inner = archive.by_index(0).map_err(std::io::Error::other)?;
        let mut s = String::new();
        inner.read_to_string(&mut s)?;
        s
    } else {
        fs::read_to_string(path)?
    };

    let snapshot: BackupSnapshot = serde_json::from_str(&content)?;
    if snapshot.format_version > BACKUP_FORMAT_VERSION {
        return Err(AppError::Other(format!(
            "backup format {} is newer than supported format {}",
            snapshot.format_version, BACKUP_FORMAT_VERSION
        )));
    }
    Ok(snapshot)
}

/// Re-insert the sessions of a snapshot. Rows whose id is still present,
/// or that would open a second session for an employee, are skipped.
/// Operations that got closed hours back are re-propagated in the same
/// transaction. Returns the number of rows inserted.
pub fn restore_snapshot(conn: &Connection, snapshot: &BackupSnapshot) -> AppResult<usize> {
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;

    let mut restored = 0;
    let mut touched = BTreeSet::new();
    for entry in &snapshot.entries {
        if insert_session_row(&tx, &entry.session)? {
            restored += 1;
            if let (Some(op), Some(_)) = (entry.session.operation_id, entry.session.punch_out) {
                touched.insert(op);
            }
        }
    }

    for operation_id in touched {
        propagate(&tx, operation_id)?;
    }

    ttlog(
        &tx,
        "restore",
        &snapshot.scope,
        &format!(
            "{} of {} entries restored from backup taken {}",
            restored,
            snapshot.entries.len(),
            snapshot.created_at
        ),
    )?;
    tx.commit()?;

    info!(scope = %snapshot.scope, restored, "backup restored");
    Ok(restored)
}
