use crate::cli::parser::Commands;
use crate::config::Config;
use crate::core::diagnostic::{detach_orphan_work_orders, diagnose, promote_tasks_to_operations};
use crate::db::pool::DbPool;
use crate::errors::AppResult;
use crate::models::diagnostic::Diagnostic;
use crate::ui::messages::{field, header, info, success, warning};
use crate::utils::formatting::or_dash;
use crate::utils::table::Table;
use crate::utils::time::format_hours;

fn print_diagnostic(d: &Diagnostic) {
    header("Time entries");
    field("Total", d.entries.total);
    field("Open", d.entries.open);
    field("On operations", d.entries.operation);
    field("On tasks", d.entries.task);
    field("General", d.entries.general);
    field("Last punch-in", or_dash(&d.entries.last_punch_in));
    println!();

    header("Operations");
    field("Total", d.operations.total);
    field("From work orders", d.operations.linked_to_work_order);
    field("Pending", d.operations.pending);
    field("In progress", d.operations.in_progress);
    field("Done", d.operations.done);
    println!();

    if !d.open_sessions.is_empty() {
        header("Open sessions");
        let mut table = Table::new(vec!["#", "Employee", "Since", "Elapsed"]);
        for s in &d.open_sessions {
            table.add_row(vec![
                s.session_id.to_string(),
                or_dash(&s.employee_name),
                s.punch_in.clone(),
                format_hours(s.hours_so_far),
            ]);
        }
        println!("{}\n", table.render());
    }

    if !d.work_orders.is_empty() {
        header("Work orders");
        let mut table = Table::new(vec!["#", "Document", "Status", "Lines", "Tasks"]);
        for w in &d.work_orders {
            table.add_row(vec![
                w.work_order_id.to_string(),
                w.doc_number.clone(),
                w.status.clone(),
                w.lines.to_string(),
                w.punchable_tasks.to_string(),
            ]);
        }
        println!("{}\n", table.render());
    }

    if d.is_healthy() {
        success("No problems found.");
    } else {
        for p in &d.problems {
            warning(p);
        }
    }
}

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::Diag {
        fix_orphans,
        promote_tasks,
        json,
    } = cmd
    {
        let pool = DbPool::open(&cfg.database)?;
        let conn = &pool.conn;

        if *fix_orphans {
            let out = detach_orphan_work_orders(conn)?;
            if out.found == 0 {
                info("No entries point at deleted work orders.");
            } else {
                success(format!(
                    "{} of {} entries detached from deleted work orders",
                    out.detached, out.found
                ));
            }
        }

        if *promote_tasks {
            let created = promote_tasks_to_operations(conn)?;
            if created == 0 {
                info("Every task line already has an operation.");
            } else {
                success(format!("{created} operations created from task lines"));
            }
        }

        if *fix_orphans || *promote_tasks {
            return Ok(());
        }

        let d = diagnose(conn)?;
        if *json {
            println!("{}", serde_json::to_string_pretty(&d)?);
        } else {
            print_diagnostic(&d);
        }
    }

    Ok(())
}
