use crate::cli::parser::{Commands, PunchAction};
use crate::config::Config;
use crate::core::punch::{get_open_session, punch_in_at, punch_out_at};
use crate::db::pool::DbPool;
use crate::errors::{AppError, AppResult};
use crate::models::session::{PunchTarget, SessionDetail};
use crate::models::unit::UnitRef;
use crate::ui::messages::{info, success, warning};
use crate::utils::formatting::money;
use crate::utils::time::{format_hours, format_ts, hours_between, now, parse_ts_arg};

fn describe(d: &SessionDetail) -> String {
    let what = match (&d.unit_description, &d.work_order_number) {
        (Some(u), Some(wo)) => format!("{u} [{wo}]"),
        (Some(u), None) => u.clone(),
        _ => format!("{} punch", d.kind.label()),
    };
    match &d.project_name {
        Some(p) => format!("{what} on {p}"),
        None => what,
    }
}

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::Punch { action } = cmd {
        let pool = DbPool::open(&cfg.database)?;
        let conn = &pool.conn;

        match action {
            PunchAction::In {
                employee,
                unit,
                project,
                notes,
                at,
            } => {
                let target = match unit {
                    Some(raw) => PunchTarget::Unit(raw.parse::<UnitRef>()?),
                    None => PunchTarget::General {
                        project_id: *project,
                    },
                };
                let at = at.as_deref().map(parse_ts_arg).transpose()?.unwrap_or_else(now);

                match punch_in_at(conn, *employee, target, notes, at) {
                    Ok(id) => {
                        success(format!("Session #{id} opened at {}", format_ts(&at)));
                        if let Some(d) = get_open_session(conn, *employee)? {
                            info(describe(&d));
                        }
                    }
                    Err(AppError::AlreadyOpen { session_id, .. }) => {
                        warning(format!(
                            "Employee {employee} is already punched in (session #{session_id})."
                        ));
                        if let Some(d) = get_open_session(conn, *employee)? {
                            info(format!(
                                "Open since {}: {}",
                                format_ts(&d.session.punch_in),
                                describe(&d)
                            ));
                        }
                        return Err(AppError::AlreadyOpen {
                            employee_id: *employee,
                            session_id,
                        });
                    }
                    Err(e) => return Err(e),
                }
            }

            PunchAction::Out {
                employee,
                notes,
                at,
            } => {
                let at = at.as_deref().map(parse_ts_arg).transpose()?.unwrap_or_else(now);
                let closed = punch_out_at(conn, cfg, *employee, notes.as_deref(), at)?;
                let s = &closed.session;

                success(format!(
                    "Session #{} closed: {} at {}/h = {}",
                    s.id,
                    format_hours(s.total_hours.unwrap_or_default()),
                    money(s.hourly_rate.unwrap_or_default()),
                    money(s.total_cost.unwrap_or_default())
                ));

                if let Some(p) = closed.progress {
                    let status = p.status.map(|st| st.label()).unwrap_or("unchanged");
                    info(format!(
                        "Operation {}: {:.1} / {:.1} h ({:.0}%), status {}",
                        p.operation_id, p.total_hours, p.estimated_hours, p.percent, status
                    ));
                }
            }

            PunchAction::Status { employee } => match get_open_session(conn, *employee)? {
                Some(d) => {
                    let elapsed = hours_between(&d.session.punch_in, &now()).max(0.0);
                    let who = d
                        .employee_name
                        .clone()
                        .unwrap_or_else(|| format!("Employee {employee}"));
                    info(format!(
                        "{who} punched in since {} ({}): {}",
                        format_ts(&d.session.punch_in),
                        format_hours(elapsed),
                        describe(&d)
                    ));
                }
                None => info(format!("Employee {employee} is not punched in.")),
            },
        }
    }

    Ok(())
}
