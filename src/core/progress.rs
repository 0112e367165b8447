//! Progress of formal operations, recomputed from closed sessions.
//!
//! Nothing is ever accumulated: every call sums the hours of all closed
//! sessions of the operation, so running it again converges on the same
//! answer. Restoring a backup re-runs it for the operations it touches.
//! A purge leaves operation statuses as they were.

use crate::db::log::ttlog;
use crate::db::sessions::closed_hours_for_operation;
use crate::errors::AppResult;
use crate::models::report::Progress;
use crate::models::unit::{UnitRef, UnitStatus};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, info};

/// Percent complete (capped at 100) and the status it implies.
///
/// `None` when there is no positive estimate to measure against. The
/// status is `None` while no hours have been booked.
pub fn compute(total_hours: f64, estimated_hours: Option<f64>) -> Option<(f64, Option<UnitStatus>)> {
    let est = estimated_hours.filter(|e| *e > 0.0)?;
    let raw = total_hours / est * 100.0;

    let status = if raw >= 100.0 {
        Some(UnitStatus::Done)
    } else if raw > 0.0 {
        Some(UnitStatus::InProgress)
    } else {
        None
    };

    Some((raw.min(100.0), status))
}

/// Recompute one operation and store the derived status.
///
/// Returns `None` for unknown operations and for operations without a
/// positive estimate; neither is an error.
pub fn propagate(conn: &Connection, operation_id: i64) -> AppResult<Option<Progress>> {
    let row: Option<(Option<f64>, String)> = conn
        .query_row(
            "SELECT estimated_hours, status FROM operations WHERE id = ?1",
            [operation_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    let Some((estimated, current)) = row else {
        debug!(operation_id, "operation no longer exists, nothing to propagate");
        return Ok(None);
    };

    let total = closed_hours_for_operation(conn, operation_id)?;
    let Some((percent, status)) = compute(total, estimated) else {
        debug!(operation_id, total, "operation has no estimate, status unchanged");
        return Ok(None);
    };

    if let Some(st) = status
        && current != st.to_db_str()
    {
        conn.execute(
            "UPDATE operations SET status = ?1 WHERE id = ?2",
            params![st.to_db_str(), operation_id],
        )?;
        ttlog(
            conn,
            "progress",
            &UnitRef::operation(operation_id).to_string(),
            &format!("{} -> {} ({:.1}%)", current, st.to_db_str(), percent),
        )?;
        info!(operation_id, from = %current, to = st.to_db_str(), "operation status updated");
    }

    Ok(Some(Progress {
        operation_id,
        total_hours: total,
        estimated_hours: estimated.unwrap_or_default(),
        percent,
        status,
    }))
}
