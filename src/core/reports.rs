//! Read models over `time_entries`. Hours and costs only count closed
//! sessions; session counts include open ones.

use crate::core::resolver::resolve_unit;
use crate::db::directory::{load_employee, project_name};
use crate::db::sessions::query_details;
use crate::errors::AppResult;
use crate::models::report::{
    ActiveSession, DailySummary, EmployeeStatistics, PerformanceLabel, ProjectTimeSummary,
    TrackerStatistics, UnitTimeSummary, WorkCenterStatistics, WorkCenterUsage,
};
use crate::models::session::SessionDetail;
use crate::models::unit::{UnitKind, UnitRef};
use crate::utils::date::{date_str, today, window_start};
use crate::utils::time::{format_ts, hours_between, now};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{Connection, params};

/// `(actual - estimate) / estimate`, in percent.
pub fn variance_percent(actual: f64, estimate: Option<f64>) -> Option<f64> {
    estimate
        .filter(|e| *e > 0.0)
        .map(|e| (actual - e) / e * 100.0)
}

pub fn unit_time_summary(conn: &Connection, unit: UnitRef) -> AppResult<UnitTimeSummary> {
    let detail = resolve_unit(conn, unit)?;

    let column = match unit.kind {
        UnitKind::Operation => "operation_id",
        UnitKind::EmbeddedTask => "work_order_line_id",
    };
    let sql = format!(
        "SELECT COUNT(*),
                COUNT(DISTINCT employee_id),
                COALESCE(SUM(CASE WHEN punch_out IS NOT NULL THEN total_hours END), 0.0),
                COALESCE(SUM(CASE WHEN punch_out IS NOT NULL THEN total_cost END), 0.0),
                MIN(punch_in),
                MAX(punch_in)
         FROM time_entries
         WHERE {column} = ?1"
    );

    let (sessions_count, unique_employees, total_hours, total_cost, first_punch, last_punch) =
        conn.query_row(&sql, [unit.id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, f64>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, Option<String>>(5)?,
            ))
        })?;

    let variance = variance_percent(total_hours, detail.estimated_hours);

    Ok(UnitTimeSummary {
        unit,
        description: detail.display_name(),
        sessions_count,
        unique_employees,
        total_hours,
        total_cost,
        estimated_hours: detail.estimated_hours,
        estimate_variance_percent: variance,
        performance: PerformanceLabel::from_variance(variance),
        status: detail.status,
        first_punch,
        last_punch,
    })
}

/// Sessions punched in during the last `days` days, newest first.
pub fn history(conn: &Connection, employee: Option<i64>, days: i64) -> AppResult<Vec<SessionDetail>> {
    history_since(conn, employee, window_start(today(), days))
}

pub fn history_since(
    conn: &Connection,
    employee: Option<i64>,
    since: NaiveDate,
) -> AppResult<Vec<SessionDetail>> {
    let since = date_str(&since);
    match employee {
        Some(id) => query_details(
            conn,
            "DATE(te.punch_in) >= ?1 AND te.employee_id = ?2",
            params![since, id],
        ),
        None => query_details(conn, "DATE(te.punch_in) >= ?1", params![since]),
    }
}

pub fn daily_summary(conn: &Connection, date: NaiveDate) -> AppResult<DailySummary> {
    let day = date_str(&date);
    let summary = conn.query_row(
        "SELECT COUNT(*),
                COUNT(punch_out),
                COUNT(*) - COUNT(punch_out),
                COUNT(DISTINCT employee_id),
                COUNT(DISTINCT project_id),
                COUNT(DISTINCT operation_id),
                COALESCE(SUM(total_hours), 0.0),
                COALESCE(SUM(total_cost), 0.0)
         FROM time_entries
         WHERE DATE(punch_in) = ?1",
        [&day],
        |row| {
            Ok(DailySummary {
                date: day.clone(),
                total_punches: row.get(0)?,
                completed_punches: row.get(1)?,
                active_punches: row.get(2)?,
                unique_employees: row.get(3)?,
                unique_projects: row.get(4)?,
                unique_operations: row.get(5)?,
                total_hours: row.get(6)?,
                total_cost: row.get(7)?,
            })
        },
    )?;
    Ok(summary)
}

/// Closed-session statistics of one employee over the last `days` days.
pub fn employee_statistics(
    conn: &Connection,
    employee_id: i64,
    days: i64,
) -> AppResult<EmployeeStatistics> {
    employee_statistics_since(conn, employee_id, days, window_start(today(), days))
}

fn employee_statistics_since(
    conn: &Connection,
    employee_id: i64,
    days: i64,
    since: NaiveDate,
) -> AppResult<EmployeeStatistics> {
    let employee = load_employee(conn, employee_id)?;

    let (total_sessions, unique_projects, unique_operations, total_hours, total_cost, avg_rate) =
        conn.query_row(
            "SELECT COUNT(*),
                    COUNT(DISTINCT project_id),
                    COUNT(DISTINCT operation_id),
                    COALESCE(SUM(total_hours), 0.0),
                    COALESCE(SUM(total_cost), 0.0),
                    COALESCE(AVG(hourly_rate), 0.0)
             FROM time_entries
             WHERE employee_id = ?1
               AND punch_out IS NOT NULL
               AND DATE(punch_in) >= ?2",
            params![employee_id, date_str(&since)],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, f64>(3)?,
                    row.get::<_, f64>(4)?,
                    row.get::<_, f64>(5)?,
                ))
            },
        )?;

    let avg_session_hours = if total_sessions > 0 {
        total_hours / total_sessions as f64
    } else {
        0.0
    };

    Ok(EmployeeStatistics {
        employee_id,
        employee_name: employee.as_ref().map(|e| e.display_name()),
        employee_role: employee.and_then(|e| e.role),
        days,
        total_sessions,
        unique_projects,
        unique_operations,
        total_hours,
        total_cost,
        avg_session_hours,
        avg_hourly_rate: avg_rate,
    })
}

pub fn project_time_summary(conn: &Connection, project_id: i64) -> AppResult<ProjectTimeSummary> {
    let mut summary = conn.query_row(
        "SELECT COUNT(*),
                COUNT(DISTINCT employee_id),
                COUNT(DISTINCT operation_id),
                COALESCE(SUM(total_hours), 0.0),
                COALESCE(SUM(total_cost), 0.0),
                MIN(punch_in),
                MAX(punch_in)
         FROM time_entries
         WHERE project_id = ?1",
        [project_id],
        |row| {
            Ok(ProjectTimeSummary {
                project_id,
                project_name: None,
                total_sessions: row.get(0)?,
                unique_employees: row.get(1)?,
                unique_operations: row.get(2)?,
                total_hours: row.get(3)?,
                total_cost: row.get(4)?,
                first_punch: row.get(5)?,
                last_punch: row.get(6)?,
            })
        },
    )?;
    summary.project_name = project_name(conn, project_id)?;
    Ok(summary)
}

pub fn tracker_statistics(conn: &Connection) -> AppResult<TrackerStatistics> {
    tracker_statistics_on(conn, today())
}

pub fn tracker_statistics_on(conn: &Connection, day: NaiveDate) -> AppResult<TrackerStatistics> {
    let total_employees: i64 = conn.query_row(
        "SELECT COUNT(*) FROM employees WHERE status = 'ACTIVE'",
        [],
        |row| row.get(0),
    )?;

    let mut stats = conn.query_row(
        "SELECT COUNT(*),
                COUNT(*) - COUNT(punch_out),
                COUNT(operation_id),
                SUM(CASE WHEN operation_id IS NULL
                          AND (work_order_id IS NOT NULL OR work_order_line_id IS NOT NULL)
                         THEN 1 ELSE 0 END),
                SUM(CASE WHEN operation_id IS NULL AND work_order_id IS NULL
                          AND work_order_line_id IS NULL
                         THEN 1 ELSE 0 END)
         FROM time_entries",
        [],
        |row| {
            Ok(TrackerStatistics {
                total_entries: row.get(0)?,
                open_entries: row.get(1)?,
                operation_entries: row.get(2)?,
                task_entries: row.get::<_, Option<i64>>(3)?.unwrap_or(0),
                general_entries: row.get::<_, Option<i64>>(4)?.unwrap_or(0),
                ..TrackerStatistics::default()
            })
        },
    )?;
    stats.total_employees = total_employees;

    let day = date_str(&day);
    conn.query_row(
        "SELECT COUNT(*),
                COALESCE(SUM(total_hours), 0.0),
                COALESCE(SUM(total_cost), 0.0),
                COALESCE(SUM(CASE WHEN operation_id IS NOT NULL THEN total_cost END), 0.0),
                COALESCE(SUM(CASE WHEN operation_id IS NULL
                                   AND (work_order_id IS NOT NULL OR work_order_line_id IS NOT NULL)
                                  THEN total_cost END), 0.0)
         FROM time_entries
         WHERE DATE(punch_in) = ?1 AND punch_out IS NOT NULL",
        [&day],
        |row| {
            stats.entries_today = row.get(0)?;
            stats.hours_today = row.get(1)?;
            stats.cost_today = row.get(2)?;
            stats.operation_cost_today = row.get(3)?;
            stats.task_cost_today = row.get(4)?;
            Ok(())
        },
    )?;

    Ok(stats)
}

/// Label for work centers without a department.
const NO_DEPARTMENT: &str = "(none)";

pub fn work_center_statistics(conn: &Connection) -> AppResult<WorkCenterStatistics> {
    let mut stats = WorkCenterStatistics::default();

    {
        let mut stmt = conn.prepare(
            "SELECT COALESCE(NULLIF(TRIM(department), ''), ?1), COUNT(*)
             FROM work_centers
             GROUP BY 1",
        )?;
        let rows = stmt.query_map([NO_DEPARTMENT], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        for r in rows {
            let (department, count) = r?;
            stats.total_work_centers += count;
            stats.by_department.insert(department, count);
        }
    }

    let mut stmt = conn.prepare(
        "SELECT wc.id, wc.name, wc.department,
                COUNT(DISTINCT o.id),
                COUNT(DISTINCT te.id),
                COALESCE(SUM(te.total_hours), 0.0),
                COALESCE(SUM(te.total_cost), 0.0)
         FROM work_centers wc
         LEFT JOIN operations o ON o.work_center_id = wc.id
         LEFT JOIN time_entries te ON te.operation_id = o.id AND te.punch_out IS NOT NULL
         GROUP BY wc.id
         ORDER BY 6 DESC, wc.name",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(WorkCenterUsage {
            work_center_id: row.get(0)?,
            name: row.get(1)?,
            department: row.get(2)?,
            operations: row.get(3)?,
            sessions: row.get(4)?,
            hours: row.get(5)?,
            cost: row.get(6)?,
        })
    })?;

    for r in rows {
        let usage = r?;
        if usage.operations > 0 {
            stats.used_work_centers += 1;
        }
        stats.operation_sessions += usage.sessions;
        stats.operation_hours += usage.hours;
        stats.per_work_center.push(usage);
    }

    Ok(stats)
}

pub fn active_sessions(conn: &Connection) -> AppResult<Vec<ActiveSession>> {
    active_sessions_at(conn, now())
}

/// Everyone currently punched in, longest running first.
pub fn active_sessions_at(conn: &Connection, at: NaiveDateTime) -> AppResult<Vec<ActiveSession>> {
    let mut open = query_details(conn, "te.punch_out IS NULL", params![])?;
    open.sort_by_key(|d| (d.session.punch_in, d.session.id));

    Ok(open
        .into_iter()
        .map(|d| ActiveSession {
            session_id: d.session.id,
            employee_id: d.session.employee_id,
            employee_name: d.employee_name,
            project_name: d.project_name,
            unit_description: d.unit_description,
            work_order_number: d.work_order_number,
            punch_in: format_ts(&d.session.punch_in),
            hours_so_far: hours_between(&d.session.punch_in, &at).max(0.0),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variance_against_estimate() {
        assert_eq!(variance_percent(12.0, Some(10.0)), Some(20.0));
        assert_eq!(variance_percent(5.0, Some(10.0)), Some(-50.0));
        assert_eq!(variance_percent(5.0, Some(0.0)), None);
        assert_eq!(variance_percent(5.0, None), None);
    }
}
