use crate::cli::parser::{Commands, ReportKind};
use crate::config::Config;
use crate::core::reports;
use crate::db::pool::DbPool;
use crate::errors::AppResult;
use crate::models::unit::UnitRef;
use crate::ui::messages::{field, header, info};
use crate::utils::colors::{RESET, color_for_variance};
use crate::utils::date::{parse_date_arg, today};
use crate::utils::formatting::{money, or_dash, percent};
use crate::utils::table::Table;
use crate::utils::time::format_hours;
use serde::Serialize;

fn print_json<T: Serialize>(value: &T) -> AppResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::Report { kind, json } = cmd {
        let pool = DbPool::open(&cfg.database)?;
        let conn = &pool.conn;

        match kind {
            ReportKind::Daily { date } => {
                let day = match date {
                    Some(d) => parse_date_arg(d)?,
                    None => today(),
                };
                let s = reports::daily_summary(conn, day)?;
                if *json {
                    return print_json(&s);
                }
                header(format!("Daily summary {}", s.date));
                field("Punches", s.total_punches);
                field("Completed", s.completed_punches);
                field("Active", s.active_punches);
                field("Employees", s.unique_employees);
                field("Projects", s.unique_projects);
                field("Operations", s.unique_operations);
                field("Hours", format_hours(s.total_hours));
                field("Cost", money(s.total_cost));
            }

            ReportKind::Employee { id, days } => {
                let s = reports::employee_statistics(conn, *id, *days)?;
                if *json {
                    return print_json(&s);
                }
                header(format!(
                    "{} ({}), last {} days",
                    s.employee_name.clone().unwrap_or_else(|| format!("Employee {id}")),
                    or_dash(&s.employee_role),
                    s.days
                ));
                field("Closed sessions", s.total_sessions);
                field("Projects", s.unique_projects);
                field("Operations", s.unique_operations);
                field("Hours", format_hours(s.total_hours));
                field("Cost", money(s.total_cost));
                field("Avg session", format_hours(s.avg_session_hours));
                field("Avg rate", format!("{}/h", money(s.avg_hourly_rate)));
            }

            ReportKind::Project { id } => {
                let s = reports::project_time_summary(conn, *id)?;
                if *json {
                    return print_json(&s);
                }
                header(format!(
                    "Project {}",
                    s.project_name.clone().unwrap_or_else(|| format!("#{id}"))
                ));
                field("Sessions", s.total_sessions);
                field("Employees", s.unique_employees);
                field("Operations", s.unique_operations);
                field("Hours", format_hours(s.total_hours));
                field("Cost", money(s.total_cost));
                field("First punch", or_dash(&s.first_punch));
                field("Last punch", or_dash(&s.last_punch));
            }

            ReportKind::Unit { unit } => {
                let unit: UnitRef = unit.parse()?;
                let s = reports::unit_time_summary(conn, unit)?;
                if *json {
                    return print_json(&s);
                }
                header(format!("{} {}", s.unit, s.description));
                field("Status", s.status.label());
                field("Sessions", s.sessions_count);
                field("Employees", s.unique_employees);
                field("Hours", format_hours(s.total_hours));
                field(
                    "Estimate",
                    s.estimated_hours.map(format_hours).unwrap_or_else(|| "--".into()),
                );
                field("Cost", money(s.total_cost));
                let variance = s
                    .estimate_variance_percent
                    .map(percent)
                    .unwrap_or_else(|| "--".into());
                field(
                    "Variance",
                    format!(
                        "{}{}{} ({})",
                        color_for_variance(s.estimate_variance_percent),
                        variance,
                        RESET,
                        s.status_label()
                    ),
                );
            }

            ReportKind::Stats => {
                let s = reports::tracker_statistics(conn)?;
                if *json {
                    return print_json(&s);
                }
                header("Tracker statistics");
                field("Active employees", s.total_employees);
                field("Entries", s.total_entries);
                field("Open entries", s.open_entries);
                field("On operations", s.operation_entries);
                field("On tasks", s.task_entries);
                field("General", s.general_entries);
                field("Closed today", s.entries_today);
                field("Hours today", format_hours(s.hours_today));
                field("Cost today", money(s.cost_today));
                field("  operations", money(s.operation_cost_today));
                field("  tasks", money(s.task_cost_today));
            }

            ReportKind::WorkCenters => {
                let s = reports::work_center_statistics(conn)?;
                if *json {
                    return print_json(&s);
                }
                header("Work centers");
                field("Work centers", s.total_work_centers);
                for (department, count) in &s.by_department {
                    field(&format!("  {department}"), count);
                }
                field("Used by operations", s.used_work_centers);
                field("Operation sessions", s.operation_sessions);
                field("Operation hours", format_hours(s.operation_hours));

                if !s.per_work_center.is_empty() {
                    println!();
                    let mut table =
                        Table::new(vec!["#", "Work center", "Department", "Ops", "Sessions", "Hours", "Cost"]);
                    for w in s.per_work_center {
                        table.add_row(vec![
                            w.work_center_id.to_string(),
                            w.name,
                            or_dash(&w.department),
                            w.operations.to_string(),
                            w.sessions.to_string(),
                            format_hours(w.hours),
                            money(w.cost),
                        ]);
                    }
                    println!("{}", table.render());
                }
            }

            ReportKind::Active => {
                let rows = reports::active_sessions(conn)?;
                if *json {
                    return print_json(&rows);
                }
                if rows.is_empty() {
                    info("Nobody is punched in.");
                    return Ok(());
                }
                let mut table =
                    Table::new(vec!["#", "Employee", "Unit", "Work order", "Project", "Since", "Elapsed"]);
                for a in rows {
                    table.add_row(vec![
                        a.session_id.to_string(),
                        a.employee_name.unwrap_or_else(|| format!("#{}", a.employee_id)),
                        a.unit_description.unwrap_or_else(|| "general".into()),
                        a.work_order_number.unwrap_or_else(|| "--".into()),
                        a.project_name.unwrap_or_else(|| "--".into()),
                        a.punch_in,
                        format_hours(a.hours_so_far),
                    ]);
                }
                println!("{}", table.render());
            }
        }
    }

    Ok(())
}
