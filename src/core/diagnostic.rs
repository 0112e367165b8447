//! Health check of tracker data and the two repairs it can suggest.

use crate::core::purge::count_orphans;
use crate::core::reports::active_sessions;
use crate::core::resolver::resolve_unit;
use crate::db::log::ttlog;
use crate::errors::{AppError, AppResult};
use crate::models::diagnostic::{
    DetachOutcome, Diagnostic, EntryCounts, OperationCounts, WorkOrderLines,
};
use crate::models::unit::{UnitRef, is_punchable_line};
use rusqlite::{Connection, Transaction, TransactionBehavior, params};
use std::collections::BTreeMap;
use tracing::info;

fn entry_counts(conn: &Connection) -> AppResult<EntryCounts> {
    Ok(conn.query_row(
        "SELECT COUNT(*),
                COUNT(*) - COUNT(punch_out),
                COUNT(operation_id),
                COALESCE(SUM(CASE WHEN operation_id IS NULL
                                   AND (work_order_id IS NOT NULL OR work_order_line_id IS NOT NULL)
                                  THEN 1 END), 0),
                COALESCE(SUM(CASE WHEN operation_id IS NULL AND work_order_id IS NULL
                                   AND work_order_line_id IS NULL
                                  THEN 1 END), 0),
                MAX(punch_in)
         FROM time_entries",
        [],
        |row| {
            Ok(EntryCounts {
                total: row.get(0)?,
                open: row.get(1)?,
                operation: row.get(2)?,
                task: row.get(3)?,
                general: row.get(4)?,
                last_punch_in: row.get(5)?,
            })
        },
    )?)
}

fn operation_counts(conn: &Connection) -> AppResult<OperationCounts> {
    Ok(conn.query_row(
        "SELECT COUNT(*),
                COUNT(work_order_id),
                COALESCE(SUM(status = 'TODO'), 0),
                COALESCE(SUM(status = 'IN_PROGRESS'), 0),
                COALESCE(SUM(status = 'DONE'), 0)
         FROM operations",
        [],
        |row| {
            Ok(OperationCounts {
                total: row.get(0)?,
                linked_to_work_order: row.get(1)?,
                pending: row.get(2)?,
                in_progress: row.get(3)?,
                done: row.get(4)?,
            })
        },
    )?)
}

fn work_order_lines(conn: &Connection) -> AppResult<Vec<WorkOrderLines>> {
    let mut stmt = conn.prepare(
        "SELECT wo.id, wo.doc_number, wo.status, wl.id, wl.sequence_number, wl.description
         FROM work_orders wo
         LEFT JOIN work_order_lines wl ON wl.work_order_id = wo.id
         WHERE wo.status != 'CANCELLED'
         ORDER BY wo.id DESC",
    )?;

    let mut by_order: BTreeMap<i64, WorkOrderLines> = BTreeMap::new();
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, Option<i64>>(3)?,
            row.get::<_, Option<i64>>(4)?,
            row.get::<_, Option<String>>(5)?,
        ))
    })?;

    for r in rows {
        let (wo_id, doc, status, line_id, seq, desc) = r?;
        let entry = by_order.entry(wo_id).or_insert_with(|| WorkOrderLines {
            work_order_id: wo_id,
            doc_number: doc,
            status,
            lines: 0,
            punchable_tasks: 0,
        });
        if line_id.is_some() {
            entry.lines += 1;
            if is_punchable_line(seq.unwrap_or(0), desc.as_deref()) {
                entry.punchable_tasks += 1;
            }
        }
    }

    Ok(by_order.into_values().rev().collect())
}

/// Snapshot of tracker health. Read-only.
pub fn diagnose(conn: &Connection) -> AppResult<Diagnostic> {
    let entries = entry_counts(conn)?;
    let open_sessions = active_sessions(conn)?;
    let operations = operation_counts(conn)?;
    let work_orders = work_order_lines(conn)?;
    let orphans = count_orphans(conn)?;

    let mut problems = Vec::new();
    if orphans.employee > 0 {
        problems.push(format!("{} entries reference deleted employees", orphans.employee));
    }
    if orphans.project > 0 {
        problems.push(format!("{} entries reference deleted projects", orphans.project));
    }
    if orphans.operation > 0 {
        problems.push(format!("{} entries reference deleted operations", orphans.operation));
    }
    if orphans.work_order > 0 {
        problems.push(format!(
            "{} entries reference deleted work orders",
            orphans.work_order
        ));
    }

    let empty_orders = work_orders.iter().filter(|w| w.punchable_tasks == 0).count();
    if empty_orders > 0 {
        problems.push(format!("{empty_orders} work orders have no punchable task"));
    }

    Ok(Diagnostic {
        entries,
        open_sessions,
        operations,
        work_orders,
        orphans,
        problems,
    })
}

/// Clear dangling work-order links, keeping the entries. An entry with no
/// operation left becomes a general punch.
pub fn detach_orphan_work_orders(conn: &Connection) -> AppResult<DetachOutcome> {
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;

    let found: i64 = tx.query_row(
        "SELECT COUNT(*) FROM time_entries te
         WHERE te.work_order_id IS NOT NULL
           AND NOT EXISTS (SELECT 1 FROM work_orders wo WHERE wo.id = te.work_order_id)",
        [],
        |row| row.get(0),
    )?;

    let detached = tx.execute(
        "UPDATE time_entries
         SET work_order_id = NULL, work_order_line_id = NULL
         WHERE work_order_id IS NOT NULL
           AND NOT EXISTS (SELECT 1 FROM work_orders wo WHERE wo.id = time_entries.work_order_id)",
        [],
    )?;

    if detached > 0 {
        ttlog(
            &tx,
            "detach",
            "orphans:work_order",
            &format!("{detached} entries detached from deleted work orders"),
        )?;
    }
    tx.commit()?;

    info!(found, detached, "orphan work order links cleared");
    Ok(DetachOutcome {
        found: usize::try_from(found).map_err(|e| AppError::Other(e.to_string()))?,
        detached,
    })
}

/// Create an `operations` row for every punchable task line that has no
/// operation with the same work order and sequence number yet. Returns
/// the number of operations created.
pub fn promote_tasks_to_operations(conn: &Connection) -> AppResult<usize> {
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;

    let candidates: Vec<(i64, Option<String>)> = {
        let mut stmt = tx.prepare(
            "SELECT wl.id, wl.description
             FROM work_order_lines wl
             JOIN work_orders wo ON wo.id = wl.work_order_id
             WHERE wo.status != 'CANCELLED'
               AND NOT EXISTS (
                   SELECT 1 FROM operations o
                   WHERE o.work_order_id = wl.work_order_id
                     AND o.sequence_number = wl.sequence_number
               )
             ORDER BY wl.work_order_id, wl.sequence_number",
        )?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        rows
    };

    let mut created = 0;
    for (line_id, raw_description) in candidates {
        let unit = match resolve_unit(&tx, UnitRef::task(line_id)) {
            Ok(u) => u,
            Err(AppError::UnitNotFound(_)) => continue,
            Err(e) => return Err(e),
        };
        let description = raw_description.unwrap_or_default();

        tx.execute(
            "INSERT INTO operations
                (project_id, work_order_id, work_center_id, sequence_number,
                 description, estimated_hours, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'TODO')",
            params![
                unit.project_id,
                unit.work_order_id,
                unit.work_center_id,
                unit.sequence_number,
                description.trim(),
                unit.estimated_hours.unwrap_or(0.0),
            ],
        )?;
        created += 1;
    }

    if created > 0 {
        ttlog(
            &tx,
            "promote",
            "work_order_lines",
            &format!("{created} task lines promoted to operations"),
        )?;
    }
    tx.commit()?;

    info!(created, "task lines promoted");
    Ok(created)
}
