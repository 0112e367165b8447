//! Bulk deletion of punch history.
//!
//! Every variant follows the same order inside one IMMEDIATE transaction:
//! select the rows, snapshot them when a backup is requested, serialize
//! (and write) the snapshot, and only then delete. A snapshot that cannot
//! be produced aborts the purge with [`AppError::BackupFailure`] and
//! leaves the table untouched.

use crate::core::backup::{self, BackupMode};
use crate::db::directory::employee_name;
use crate::db::log::ttlog;
use crate::db::sessions::{delete_sessions, select_ids};
use crate::errors::{AppError, AppResult};
use crate::models::purge::{OrphanCounts, PurgeOutcome};
use crate::utils::date::{date_str, retention_cutoff};
use crate::utils::time::{format_ts, now};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{Connection, ToSql, Transaction, TransactionBehavior, params};
use std::collections::HashSet;
use tracing::{info, warn};

const ORPHAN_EMPLOYEE: &str =
    "NOT EXISTS (SELECT 1 FROM employees e WHERE e.id = te.employee_id)";
const ORPHAN_PROJECT: &str = "te.project_id IS NOT NULL \
     AND NOT EXISTS (SELECT 1 FROM projects p WHERE p.id = te.project_id)";
const ORPHAN_OPERATION: &str = "te.operation_id IS NOT NULL \
     AND NOT EXISTS (SELECT 1 FROM operations o WHERE o.id = te.operation_id)";
const ORPHAN_WORK_ORDER: &str = "te.work_order_id IS NOT NULL \
     AND NOT EXISTS (SELECT 1 FROM work_orders wo WHERE wo.id = te.work_order_id)";

/// Orphan categories in the order they are purged.
pub const ORPHAN_PASSES: [(&str, &str); 4] = [
    ("employee", ORPHAN_EMPLOYEE),
    ("project", ORPHAN_PROJECT),
    ("operation", ORPHAN_OPERATION),
    ("work_order", ORPHAN_WORK_ORDER),
];

struct Backup {
    blob: Option<String>,
    path: Option<String>,
    ids: Option<HashSet<i64>>,
}

fn take_backup(
    conn: &Connection,
    scope: &str,
    filter: &str,
    params: &[&dyn ToSql],
    mode: BackupMode,
) -> AppResult<Backup> {
    if mode == BackupMode::Skip {
        return Ok(Backup {
            blob: None,
            path: None,
            ids: None,
        });
    }

    let entries = backup::collect_entries(conn, filter, params)?;
    let ids = entries.iter().map(|e| e.session.id).collect();
    let blob = backup::serialize(&backup::snapshot(scope, entries))?;

    let path = match mode {
        BackupMode::File { dir, compress } => {
            let p = backup::write_snapshot(dir, scope, &blob, compress)
                .map_err(|e| AppError::BackupFailure(e.to_string()))?;
            Some(p.to_string_lossy().into_owned())
        }
        _ => None,
    };

    Ok(Backup {
        blob: Some(blob),
        path,
        ids: Some(ids),
    })
}

fn purge_where(
    conn: &Connection,
    scope: &str,
    filter: &str,
    params: &[&dyn ToSql],
    mode: BackupMode,
) -> AppResult<(usize, Backup)> {
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;

    let backup = take_backup(&tx, scope, filter, params, mode)?;
    let ids = select_ids(&tx, filter, params)?;
    let deleted = delete_sessions(&tx, &ids)?;

    ttlog(&tx, "purge", scope, &format!("{deleted} entries deleted"))?;
    tx.commit()?;

    info!(scope, deleted, backup = backup.blob.is_some(), "purge completed");
    Ok((deleted, backup))
}

fn outcome(deleted: usize, backup: Backup, message: String) -> PurgeOutcome {
    PurgeOutcome {
        success: true,
        entries_deleted: deleted,
        backup: backup.blob,
        backup_path: backup.path,
        message,
        employee_name: None,
        orphans: None,
    }
}

pub fn purge_all(conn: &Connection, mode: BackupMode) -> AppResult<PurgeOutcome> {
    let (deleted, backup) = purge_where(conn, "all", "1 = 1", params![], mode)?;
    Ok(outcome(
        deleted,
        backup,
        format!("{deleted} entries deleted"),
    ))
}

/// Sessions whose punch-in date lies within `[start, end]`.
pub fn purge_by_date_range(
    conn: &Connection,
    start: NaiveDate,
    end: NaiveDate,
    mode: BackupMode,
) -> AppResult<PurgeOutcome> {
    if end < start {
        return Err(AppError::InvalidDate(format!(
            "range end {end} is before start {start}"
        )));
    }

    let (from, to) = (date_str(&start), date_str(&end));
    let scope = format!("range {from}:{to}");
    let (deleted, backup) = purge_where(
        conn,
        &scope,
        "DATE(te.punch_in) BETWEEN ?1 AND ?2",
        params![from, to],
        mode,
    )?;

    Ok(outcome(
        deleted,
        backup,
        format!("{deleted} entries deleted between {from} and {to}"),
    ))
}

/// Every session of one employee, open ones included.
pub fn purge_by_employee(
    conn: &Connection,
    employee_id: i64,
    mode: BackupMode,
) -> AppResult<PurgeOutcome> {
    let name = employee_name(conn, employee_id)?;
    let scope = format!("employee {employee_id}");
    let (deleted, backup) = purge_where(
        conn,
        &scope,
        "te.employee_id = ?1",
        params![employee_id],
        mode,
    )?;

    let who = name.clone().unwrap_or_else(|| format!("employee #{employee_id}"));
    Ok(PurgeOutcome {
        employee_name: name,
        ..outcome(deleted, backup, format!("{deleted} entries deleted for {who}"))
    })
}

pub fn purge_completed_older_than(
    conn: &Connection,
    days: i64,
    mode: BackupMode,
) -> AppResult<PurgeOutcome> {
    purge_completed_older_than_at(conn, days, now(), mode)
}

/// Closed sessions punched in before `now - days`. Open sessions are
/// never selected, whatever their age.
pub fn purge_completed_older_than_at(
    conn: &Connection,
    days: i64,
    now: NaiveDateTime,
    mode: BackupMode,
) -> AppResult<PurgeOutcome> {
    if days < 0 {
        return Err(AppError::Other(format!(
            "retention must be zero or more days, got {days}"
        )));
    }

    let cutoff = format_ts(&retention_cutoff(now, days));
    let scope = format!("closed older than {days} days");
    let (deleted, backup) = purge_where(
        conn,
        &scope,
        "te.punch_out IS NOT NULL AND te.punch_in < ?1",
        params![cutoff],
        mode,
    )?;

    Ok(outcome(
        deleted,
        backup,
        format!("{deleted} closed entries older than {days} days deleted"),
    ))
}

/// Sessions referencing an employee, project, operation or work order
/// that no longer exists.
///
/// One snapshot of all orphans is taken first. The four passes then run
/// in their own transactions; each one re-detects its category, so a run
/// interrupted between passes is completed by running it again. With a
/// backup, a pass only deletes rows present in the snapshot.
pub fn purge_orphaned(conn: &Connection, mode: BackupMode) -> AppResult<PurgeOutcome> {
    let any_orphan = ORPHAN_PASSES
        .iter()
        .map(|(_, f)| format!("({f})"))
        .collect::<Vec<_>>()
        .join(" OR ");

    let backup = {
        let tx = Transaction::new_unchecked(conn, TransactionBehavior::Deferred)?;
        let b = take_backup(&tx, "orphans", &any_orphan, params![], mode)?;
        tx.commit()?;
        b
    };

    let mut counts = OrphanCounts::default();
    for (category, filter) in ORPHAN_PASSES {
        let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;

        let mut ids = select_ids(&tx, filter, params![])?;
        if let Some(saved) = &backup.ids {
            let before = ids.len();
            ids.retain(|id| saved.contains(id));
            if ids.len() < before {
                warn!(
                    category,
                    skipped = before - ids.len(),
                    "orphans appeared after the backup, left for the next run"
                );
            }
        }

        let deleted = delete_sessions(&tx, &ids)?;
        if deleted > 0 {
            ttlog(
                &tx,
                "purge",
                &format!("orphans:{category}"),
                &format!("{deleted} entries deleted"),
            )?;
        }
        tx.commit()?;

        match category {
            "employee" => counts.employee = deleted,
            "project" => counts.project = deleted,
            "operation" => counts.operation = deleted,
            _ => counts.work_order = deleted,
        }
    }

    let total = counts.total();
    info!(?counts, "orphan purge completed");

    Ok(PurgeOutcome {
        orphans: Some(counts),
        ..outcome(
            total,
            backup,
            format!(
                "{} orphaned entries deleted (employee {}, project {}, operation {}, work order {})",
                total, counts.employee, counts.project, counts.operation, counts.work_order
            ),
        )
    })
}

/// Orphan counts per category without deleting anything.
pub fn count_orphans(conn: &Connection) -> AppResult<OrphanCounts> {
    let count = |filter: &str| -> AppResult<usize> {
        Ok(select_ids(conn, filter, params![])?.len())
    };
    Ok(OrphanCounts {
        employee: count(ORPHAN_EMPLOYEE)?,
        project: count(ORPHAN_PROJECT)?,
        operation: count(ORPHAN_OPERATION)?,
        work_order: count(ORPHAN_WORK_ORDER)?,
    })
}
