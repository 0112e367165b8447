//! Punch state machine: one employee is either idle or has exactly one
//! open session. Opening requires idle, closing requires open.

use crate::config::{Config, NotesMerge};
use crate::core::{progress, resolver};
use crate::db::directory::load_employee;
use crate::db::log::ttlog;
use crate::db::sessions::{self, Closing, NewSession};
use crate::errors::{AppError, AppResult};
use crate::models::directory::Employee;
use crate::models::session::{ClosedPunch, PunchTarget, SessionDetail};
use crate::models::unit::UnitKind;
use crate::utils::time::{format_ts, hours_between, now};
use chrono::NaiveDateTime;
use rusqlite::{Connection, ErrorCode, Transaction, TransactionBehavior, params};
use tracing::{debug, info};

/// Hourly rate of an employee: annual salary spread over the configured
/// work hours, or the configured fallback when no salary is on file.
pub fn rate_for(employee: Option<&Employee>, cfg: &Config) -> f64 {
    match employee.and_then(|e| e.annual_salary) {
        Some(salary) if salary > 0.0 => salary / cfg.annual_work_hours,
        _ => cfg.default_hourly_rate,
    }
}

pub fn hourly_rate(conn: &Connection, cfg: &Config, employee_id: i64) -> AppResult<f64> {
    let emp = load_employee(conn, employee_id)?;
    Ok(rate_for(emp.as_ref(), cfg))
}

/// Combine notes given at punch-out with the ones stored at punch-in.
pub fn merge_notes(policy: NotesMerge, separator: &str, stored: &str, incoming: Option<&str>) -> String {
    let stored = stored.trim();
    let incoming = incoming.map(str::trim).unwrap_or_default();

    match (stored.is_empty(), incoming.is_empty()) {
        (true, true) => String::new(),
        (false, true) => stored.to_string(),
        (true, false) => incoming.to_string(),
        (false, false) => match policy {
            NotesMerge::Append => format!("{stored}{separator}{incoming}"),
            NotesMerge::Replace => incoming.to_string(),
            NotesMerge::Keep => stored.to_string(),
        },
    }
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _) if err.code == ErrorCode::ConstraintViolation
    )
}

pub fn punch_in(
    conn: &Connection,
    employee_id: i64,
    target: PunchTarget,
    notes: &str,
) -> AppResult<i64> {
    punch_in_at(conn, employee_id, target, notes, now())
}

/// Open a session for `employee_id` at `at`.
///
/// Check and insert run in one IMMEDIATE transaction, and the storage
/// index rejects a second open row even if another writer slips past.
pub fn punch_in_at(
    conn: &Connection,
    employee_id: i64,
    target: PunchTarget,
    notes: &str,
    at: NaiveDateTime,
) -> AppResult<i64> {
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;

    if load_employee(&tx, employee_id)?.is_none() {
        return Err(AppError::EmployeeNotFound(employee_id));
    }

    if let Some(open) = sessions::find_open(&tx, employee_id)? {
        return Err(AppError::AlreadyOpen {
            employee_id,
            session_id: open.id,
        });
    }

    let mut new = NewSession {
        employee_id,
        project_id: None,
        operation_id: None,
        work_order_id: None,
        work_order_line_id: None,
        punch_in: at,
        notes: notes.trim(),
    };

    let target_label = match target {
        PunchTarget::General { project_id } => {
            new.project_id = project_id;
            "general".to_string()
        }
        PunchTarget::Unit(unit) => {
            let detail = resolver::resolve_unit(&tx, unit)?;
            new.project_id = detail.project_id;
            match unit.kind {
                UnitKind::Operation => new.operation_id = Some(unit.id),
                UnitKind::EmbeddedTask => {
                    new.work_order_id = detail.work_order_id;
                    new.work_order_line_id = Some(unit.id);
                }
            }
            unit.to_string()
        }
    };

    let session_id = match sessions::insert_session(&tx, &new) {
        Ok(id) => id,
        Err(AppError::Db(e)) if is_unique_violation(&e) => {
            let session_id = sessions::find_open(&tx, employee_id)?
                .map(|s| s.id)
                .unwrap_or_default();
            return Err(AppError::AlreadyOpen {
                employee_id,
                session_id,
            });
        }
        Err(e) => return Err(e),
    };

    ttlog(
        &tx,
        "punch_in",
        &format!("employee:{employee_id}"),
        &format!("session #{session_id} on {target_label} at {}", format_ts(&at)),
    )?;
    tx.commit()?;

    info!(employee_id, session_id, target = %target_label, "punched in");
    Ok(session_id)
}

pub fn punch_out(
    conn: &Connection,
    cfg: &Config,
    employee_id: i64,
    notes: Option<&str>,
) -> AppResult<ClosedPunch> {
    punch_out_at(conn, cfg, employee_id, notes, now())
}

/// Close the open session of `employee_id` at `at`.
///
/// Hours, rate and cost are written together, once. The rate is the one
/// in force now and is never recomputed afterwards.
pub fn punch_out_at(
    conn: &Connection,
    cfg: &Config,
    employee_id: i64,
    notes: Option<&str>,
    at: NaiveDateTime,
) -> AppResult<ClosedPunch> {
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;

    let open = sessions::find_open(&tx, employee_id)?.ok_or(AppError::NoOpenSession(employee_id))?;

    if at < open.punch_in {
        return Err(AppError::PunchOutBeforePunchIn {
            punch_in: format_ts(&open.punch_in),
            punch_out: format_ts(&at),
        });
    }

    let total_hours = hours_between(&open.punch_in, &at);
    let rate = hourly_rate(&tx, cfg, employee_id)?;
    let total_cost = total_hours * rate;
    let merged = merge_notes(cfg.notes_merge, &cfg.notes_separator, &open.notes, notes);

    let closed = sessions::close_session(
        &tx,
        open.id,
        &Closing {
            punch_out: at,
            total_hours,
            hourly_rate: rate,
            total_cost,
            notes: &merged,
        },
    )?;
    if !closed {
        return Err(AppError::NoOpenSession(employee_id));
    }

    let progress = match open.operation_id {
        Some(op) => progress::propagate(&tx, op)?,
        None => None,
    };

    ttlog(
        &tx,
        "punch_out",
        &format!("employee:{employee_id}"),
        &format!(
            "session #{} closed: {:.2} h x {:.2} = {:.2}",
            open.id, total_hours, rate, total_cost
        ),
    )?;

    let session = sessions::load_session(&tx, open.id)?
        .ok_or_else(|| AppError::Other(format!("session #{} vanished while closing", open.id)))?;
    tx.commit()?;

    debug!(session_id = session.id, ?progress, "progress after punch-out");
    info!(employee_id, session_id = session.id, total_hours, total_cost, "punched out");

    Ok(ClosedPunch { session, progress })
}

/// The employee's open session with its display context, if any.
pub fn get_open_session(conn: &Connection, employee_id: i64) -> AppResult<Option<SessionDetail>> {
    let mut rows = sessions::query_details(
        conn,
        "te.employee_id = ?1 AND te.punch_out IS NULL",
        params![employee_id],
    )?;
    Ok(if rows.is_empty() { None } else { Some(rows.remove(0)) })
}
