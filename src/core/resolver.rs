//! Unified catalogue of punchable units.
//!
//! Two physical sources feed it: rows of `operations`, and task lines
//! embedded in work orders (`work_order_lines`). Both are normalized into
//! [`UnitDetail`] and keyed by a [`UnitRef`], so ids never collide.

use crate::db::directory;
use crate::errors::{AppError, AppResult};
use crate::models::unit::{
    Catalogue, MATERIAL_SEQUENCE_FLOOR, TaskDescription, UNKNOWN_PROJECT, UnitDetail, UnitKind,
    UnitRef, UnitStatus, is_punchable_line, work_center_from_notes, work_order_project,
};
use rusqlite::{Connection, OptionalExtension, Row};
use tracing::{debug, warn};

const OPERATION_SELECT: &str = r#"
    SELECT o.id, o.sequence_number, o.description, o.estimated_hours,
           o.work_center_id, wc.name, o.status,
           o.project_id, p.name, o.work_order_id, wo.doc_number
    FROM operations o
    LEFT JOIN projects p      ON p.id = o.project_id
    LEFT JOIN work_centers wc ON wc.id = o.work_center_id
    LEFT JOIN work_orders wo  ON wo.id = o.work_order_id
"#;

const TASK_SELECT: &str = r#"
    SELECT wl.id, wl.sequence_number, wl.description, wl.estimated_value, wl.notes,
           wo.id, wo.doc_number, wo.status, wo.project_id, wo.metadata, p.name
    FROM work_order_lines wl
    JOIN work_orders wo  ON wo.id = wl.work_order_id
    LEFT JOIN projects p ON p.id = wo.project_id
"#;

fn positive(v: Option<f64>) -> Option<f64> {
    v.filter(|h| *h > 0.0)
}

fn map_operation(row: &Row) -> rusqlite::Result<UnitDetail> {
    let id: i64 = row.get(0)?;
    let raw_status: String = row.get(6)?;
    let status = UnitStatus::from_db_str(&raw_status).unwrap_or_else(|| {
        warn!(operation_id = id, status = %raw_status, "unknown operation status, treating as pending");
        UnitStatus::Pending
    });

    Ok(UnitDetail {
        unit: UnitRef::operation(id),
        sequence_number: row.get::<_, Option<i64>>(1)?.unwrap_or(0),
        operation_name: row
            .get::<_, Option<String>>(2)?
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
        description_detail: String::new(),
        estimated_hours: positive(row.get(3)?),
        work_center_id: row.get(4)?,
        work_center: row.get(5)?,
        status,
        project_id: row.get(7)?,
        project_name: row
            .get::<_, Option<String>>(8)?
            .unwrap_or_else(|| UNKNOWN_PROJECT.to_string()),
        work_order_id: row.get(9)?,
        work_order_number: row.get(10)?,
    })
}

/// Task line as stored, before normalization.
struct TaskRow {
    line_id: i64,
    sequence_number: i64,
    description: Option<String>,
    estimated_value: Option<f64>,
    notes: Option<String>,
    work_order_id: i64,
    doc_number: String,
    work_order_status: String,
    project_id: Option<i64>,
    metadata: Option<String>,
    project_name: Option<String>,
}

fn map_task_row(row: &Row) -> rusqlite::Result<TaskRow> {
    Ok(TaskRow {
        line_id: row.get(0)?,
        sequence_number: row.get::<_, Option<i64>>(1)?.unwrap_or(0),
        description: row.get(2)?,
        estimated_value: row.get(3)?,
        notes: row.get(4)?,
        work_order_id: row.get(5)?,
        doc_number: row.get(6)?,
        work_order_status: row.get(7)?,
        project_id: row.get(8)?,
        metadata: row.get(9)?,
        project_name: row.get(10)?,
    })
}

/// Project of a task line: the work order's own column first, then the
/// linkage embedded in its metadata.
fn task_project(conn: &Connection, t: &TaskRow) -> AppResult<(Option<i64>, String)> {
    if let Some(pid) = t.project_id {
        let name = match &t.project_name {
            Some(n) => n.clone(),
            None => UNKNOWN_PROJECT.to_string(),
        };
        return Ok((Some(pid), name));
    }

    let meta = work_order_project(t.metadata.as_deref());
    match meta.project_id {
        Some(pid) => {
            let name = directory::project_name(conn, pid)?
                .or(meta.project_name)
                .unwrap_or_else(|| UNKNOWN_PROJECT.to_string());
            Ok((Some(pid), name))
        }
        None => Ok((
            None,
            meta.project_name
                .unwrap_or_else(|| UNKNOWN_PROJECT.to_string()),
        )),
    }
}

fn normalize_task(conn: &Connection, t: TaskRow) -> AppResult<Option<UnitDetail>> {
    if !is_punchable_line(t.sequence_number, t.description.as_deref()) {
        return Ok(None);
    }

    let desc = TaskDescription::parse(t.description.as_deref().unwrap_or_default());
    let work_center = work_center_from_notes(t.notes.as_deref());
    let work_center_id = directory::work_center_id_by_name(conn, &work_center)?;
    let (project_id, project_name) = task_project(conn, &t)?;

    Ok(Some(UnitDetail {
        unit: UnitRef::task(t.line_id),
        sequence_number: t.sequence_number,
        operation_name: desc.operation_name,
        description_detail: desc.detail,
        estimated_hours: positive(t.estimated_value),
        work_center_id,
        work_center: Some(work_center),
        status: UnitStatus::from_work_order_status(&t.work_order_status),
        project_id,
        project_name,
        work_order_id: Some(t.work_order_id),
        work_order_number: Some(t.doc_number),
    }))
}

fn actionable_operations(conn: &Connection) -> AppResult<Vec<UnitDetail>> {
    let sql = format!(
        "{OPERATION_SELECT}
         WHERE o.status IN ('TODO', 'IN_PROGRESS')
         ORDER BY o.sequence_number, o.id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], map_operation)?;

    let mut out = Vec::new();
    for r in rows {
        let unit = r?;
        if unit.status.is_actionable() {
            out.push(unit);
        }
    }
    Ok(out)
}

/// Task lines already promoted to an operation (same work order and
/// sequence number) are listed through that operation only.
fn actionable_tasks(conn: &Connection) -> AppResult<Vec<UnitDetail>> {
    let sql = format!(
        "{TASK_SELECT}
         WHERE wo.status NOT IN ('CANCELLED', 'DONE')
           AND wl.sequence_number < ?1
           AND NOT EXISTS (
               SELECT 1 FROM operations o
               WHERE o.work_order_id = wl.work_order_id
                 AND o.sequence_number = wl.sequence_number
           )
         ORDER BY wo.doc_number, wl.sequence_number, wl.id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let raw = stmt
        .query_map([MATERIAL_SEQUENCE_FLOOR], map_task_row)?
        .collect::<Result<Vec<_>, _>>()?;

    let mut out = Vec::new();
    for t in raw {
        if let Some(unit) = normalize_task(conn, t)? {
            out.push(unit);
        }
    }
    Ok(out)
}

/// Every pending or in-progress unit from both sources, grouped by
/// work order (or project for operations without one).
pub fn list_available_units(conn: &Connection) -> AppResult<Catalogue> {
    let mut catalogue = Catalogue::new();

    let operations = actionable_operations(conn)?;
    let tasks = actionable_tasks(conn)?;
    debug!(
        operations = operations.len(),
        tasks = tasks.len(),
        "catalogue sources loaded"
    );

    for unit in operations.into_iter().chain(tasks) {
        catalogue
            .entry(unit.group_label())
            .or_default()
            .push(unit.summary());
    }

    for units in catalogue.values_mut() {
        units.sort_by(|a, b| {
            a.sequence_number
                .cmp(&b.sequence_number)
                .then(a.unit.cmp(&b.unit))
        });
    }

    Ok(catalogue)
}

/// Resolve one unit regardless of its status. Material lines and lines of
/// cancelled work orders are not units.
pub fn resolve_unit(conn: &Connection, unit: UnitRef) -> AppResult<UnitDetail> {
    let found = match unit.kind {
        UnitKind::Operation => {
            let sql = format!("{OPERATION_SELECT} WHERE o.id = ?1");
            conn.query_row(&sql, [unit.id], map_operation).optional()?
        }
        UnitKind::EmbeddedTask => {
            let sql = format!("{TASK_SELECT} WHERE wl.id = ?1 AND wo.status != 'CANCELLED'");
            match conn.query_row(&sql, [unit.id], map_task_row).optional()? {
                Some(t) => normalize_task(conn, t)?,
                None => None,
            }
        }
    };

    found.ok_or(AppError::UnitNotFound(unit))
}

/// Resolve an offset-encoded id from an older caller.
pub fn resolve_legacy_id(conn: &Connection, id: i64) -> AppResult<UnitDetail> {
    resolve_unit(conn, UnitRef::from_legacy_id(id))
}
