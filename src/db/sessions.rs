//! Row-level access to `time_entries`.

use crate::errors::{AppError, AppResult};
use crate::models::session::{PunchKind, PunchSession, SessionDetail};
use crate::models::unit::{TaskDescription, work_center_from_notes};
use crate::utils::time::{format_ts, now, parse_ts};
use chrono::NaiveDateTime;
use rusqlite::{Connection, OptionalExtension, Result, Row, ToSql, params, params_from_iter};

/// Columns read by [`map_session`], in order.
pub const SESSION_COLUMNS: &str = "te.id, te.employee_id, te.project_id, te.operation_id, \
     te.work_order_id, te.work_order_line_id, te.punch_in, te.punch_out, te.total_hours, \
     te.hourly_rate, te.total_cost, te.notes, te.created_at";

/// Session columns followed by the joined display context read by
/// [`map_detail`]. Callers append `WHERE ...` / `ORDER BY ...`.
const DETAIL_SELECT: &str = r#"
    SELECT te.id, te.employee_id, te.project_id, te.operation_id,
           te.work_order_id, te.work_order_line_id, te.punch_in, te.punch_out,
           te.total_hours, te.hourly_rate, te.total_cost, te.notes, te.created_at,
           e.first_name || ' ' || e.last_name,
           e.role,
           p.name,
           o.description,
           o.sequence_number,
           wc.name,
           wo.doc_number,
           wl.description,
           wl.sequence_number,
           wl.notes
    FROM time_entries te
    LEFT JOIN employees e         ON e.id = te.employee_id
    LEFT JOIN projects p          ON p.id = te.project_id
    LEFT JOIN operations o        ON o.id = te.operation_id
    LEFT JOIN work_centers wc     ON wc.id = o.work_center_id
    LEFT JOIN work_orders wo      ON wo.id = te.work_order_id
    LEFT JOIN work_order_lines wl ON wl.id = te.work_order_line_id
"#;

/// SQLite caps host parameters per statement; deletes are chunked below it.
const ID_CHUNK: usize = 500;

fn ts_column(row: &Row, idx: usize) -> Result<Option<NaiveDateTime>> {
    let raw: Option<String> = row.get(idx)?;
    match raw {
        None => Ok(None),
        Some(s) => parse_ts(&s).map(Some).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                idx,
                rusqlite::types::Type::Text,
                Box::new(AppError::InvalidTimestamp(s.clone())),
            )
        }),
    }
}

pub fn map_session(row: &Row) -> Result<PunchSession> {
    let punch_in = ts_column(row, 6)?.ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            6,
            rusqlite::types::Type::Null,
            Box::new(AppError::InvalidTimestamp("missing punch_in".into())),
        )
    })?;

    Ok(PunchSession {
        id: row.get(0)?,
        employee_id: row.get(1)?,
        project_id: row.get(2)?,
        operation_id: row.get(3)?,
        work_order_id: row.get(4)?,
        work_order_line_id: row.get(5)?,
        punch_in,
        punch_out: ts_column(row, 7)?,
        total_hours: row.get(8)?,
        hourly_rate: row.get(9)?,
        total_cost: row.get(10)?,
        notes: row.get::<_, Option<String>>(11)?.unwrap_or_default(),
        created_at: row.get(12)?,
    })
}

pub fn map_detail(row: &Row) -> Result<SessionDetail> {
    let session = map_session(row)?;
    let kind = session.kind();

    let op_description: Option<String> = row.get(16)?;
    let op_sequence: Option<i64> = row.get(17)?;
    let op_work_center: Option<String> = row.get(18)?;
    let line_description: Option<String> = row.get(20)?;
    let line_sequence: Option<i64> = row.get(21)?;
    let line_notes: Option<String> = row.get(22)?;

    let (unit_description, sequence_number, work_center) = match kind {
        PunchKind::Operation => (op_description, op_sequence, op_work_center),
        PunchKind::EmbeddedTask => match line_description {
            Some(d) => (
                Some(TaskDescription::parse(&d).label()),
                line_sequence,
                Some(work_center_from_notes(line_notes.as_deref())),
            ),
            None => (None, None, None),
        },
        PunchKind::General => (None, None, None),
    };

    Ok(SessionDetail {
        session,
        kind,
        employee_name: row.get(13)?,
        employee_role: row.get(14)?,
        project_name: row.get(15)?,
        unit_description,
        sequence_number,
        work_center,
        work_order_number: row.get(19)?,
    })
}

/// Detail rows matching `filter` (an SQL fragment over alias `te`).
pub fn query_details(
    conn: &Connection,
    filter: &str,
    params: &[&dyn ToSql],
) -> AppResult<Vec<SessionDetail>> {
    let sql = format!("{DETAIL_SELECT} WHERE {filter} ORDER BY te.punch_in DESC, te.id DESC");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params, map_detail)?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

/// Fields of a session at punch-in.
#[derive(Debug, Clone)]
pub struct NewSession<'a> {
    pub employee_id: i64,
    pub project_id: Option<i64>,
    pub operation_id: Option<i64>,
    pub work_order_id: Option<i64>,
    pub work_order_line_id: Option<i64>,
    pub punch_in: NaiveDateTime,
    pub notes: &'a str,
}

pub fn insert_session(conn: &Connection, s: &NewSession) -> AppResult<i64> {
    conn.execute(
        "INSERT INTO time_entries
            (employee_id, project_id, operation_id, work_order_id, work_order_line_id,
             punch_in, notes, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            s.employee_id,
            s.project_id,
            s.operation_id,
            s.work_order_id,
            s.work_order_line_id,
            format_ts(&s.punch_in),
            s.notes,
            format_ts(&now()),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Re-insert a full row with its original id. Existing ids are skipped.
pub fn insert_session_row(conn: &Connection, s: &PunchSession) -> AppResult<bool> {
    let n = conn.execute(
        "INSERT OR IGNORE INTO time_entries
            (id, employee_id, project_id, operation_id, work_order_id, work_order_line_id,
             punch_in, punch_out, total_hours, hourly_rate, total_cost, notes, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            s.id,
            s.employee_id,
            s.project_id,
            s.operation_id,
            s.work_order_id,
            s.work_order_line_id,
            format_ts(&s.punch_in),
            s.punch_out.as_ref().map(format_ts),
            s.total_hours,
            s.hourly_rate,
            s.total_cost,
            s.notes,
            s.created_at,
        ],
    )?;
    Ok(n > 0)
}

pub fn load_session(conn: &Connection, id: i64) -> AppResult<Option<PunchSession>> {
    let sql = format!("SELECT {SESSION_COLUMNS} FROM time_entries te WHERE te.id = ?1");
    let s = conn.query_row(&sql, [id], map_session).optional()?;
    Ok(s)
}

pub fn find_open(conn: &Connection, employee_id: i64) -> AppResult<Option<PunchSession>> {
    let sql = format!(
        "SELECT {SESSION_COLUMNS} FROM time_entries te
         WHERE te.employee_id = ?1 AND te.punch_out IS NULL
         ORDER BY te.punch_in DESC
         LIMIT 1"
    );
    let s = conn.query_row(&sql, [employee_id], map_session).optional()?;
    Ok(s)
}

/// Values written exactly once, when a session closes.
#[derive(Debug, Clone, Copy)]
pub struct Closing<'a> {
    pub punch_out: NaiveDateTime,
    pub total_hours: f64,
    pub hourly_rate: f64,
    pub total_cost: f64,
    pub notes: &'a str,
}

/// Close an open session. Returns false when it was already closed.
pub fn close_session(conn: &Connection, id: i64, c: &Closing) -> AppResult<bool> {
    let n = conn.execute(
        "UPDATE time_entries
         SET punch_out = ?1, total_hours = ?2, hourly_rate = ?3, total_cost = ?4, notes = ?5
         WHERE id = ?6 AND punch_out IS NULL",
        params![
            format_ts(&c.punch_out),
            c.total_hours,
            c.hourly_rate,
            c.total_cost,
            c.notes,
            id
        ],
    )?;
    Ok(n == 1)
}

/// Sum of hours over closed sessions of one operation.
pub fn closed_hours_for_operation(conn: &Connection, operation_id: i64) -> AppResult<f64> {
    let hours: f64 = conn.query_row(
        "SELECT COALESCE(SUM(total_hours), 0.0) FROM time_entries
         WHERE operation_id = ?1 AND punch_out IS NOT NULL",
        [operation_id],
        |row| row.get(0),
    )?;
    Ok(hours)
}

pub fn select_ids(conn: &Connection, filter: &str, params: &[&dyn ToSql]) -> AppResult<Vec<i64>> {
    let sql = format!("SELECT te.id FROM time_entries te WHERE {filter} ORDER BY te.id");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params, |row| row.get::<_, i64>(0))?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

pub fn delete_sessions(conn: &Connection, ids: &[i64]) -> AppResult<usize> {
    let mut deleted = 0;
    for chunk in ids.chunks(ID_CHUNK) {
        let placeholders = vec!["?"; chunk.len()].join(",");
        let sql = format!("DELETE FROM time_entries WHERE id IN ({placeholders})");
        deleted += conn.execute(&sql, params_from_iter(chunk.iter()))?;
    }
    Ok(deleted)
}

pub fn count_open_sessions(conn: &Connection, employee_id: i64) -> AppResult<i64> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM time_entries WHERE employee_id = ?1 AND punch_out IS NULL",
        [employee_id],
        |row| row.get(0),
    )?)
}
