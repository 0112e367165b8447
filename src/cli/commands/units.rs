use crate::cli::parser::Commands;
use crate::config::Config;
use crate::core::resolver::{list_available_units, resolve_unit};
use crate::db::pool::DbPool;
use crate::errors::AppResult;
use crate::models::unit::UnitRef;
use crate::ui::messages::{field, header, info};
use crate::utils::colors::{GREY, RESET};
use crate::utils::table::Table;

fn hours_cell(h: Option<f64>) -> String {
    h.map(|v| format!("{v:.1} h")).unwrap_or_else(|| "--".into())
}

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::Units { show, json } = cmd {
        let pool = DbPool::open(&cfg.database)?;

        //
        // Single unit
        //
        if let Some(raw) = show {
            let unit: UnitRef = raw.parse()?;
            let detail = resolve_unit(&pool.conn, unit)?;

            if *json {
                println!("{}", serde_json::to_string_pretty(&detail)?);
                return Ok(());
            }

            header(format!("{} {}", detail.unit, detail.display_name()));
            field("Group", detail.group_label());
            field("Status", detail.status.label());
            field("Estimate", hours_cell(detail.estimated_hours));
            field("Station", detail.work_center.as_deref().unwrap_or("--"));
            match unit.legacy_id() {
                Some(id) => field("Legacy id", format!("{GREY}{id}{RESET}")),
                None => field(
                    "Legacy id",
                    format!("{GREY}(none, id collides with task range){RESET}"),
                ),
            }
            return Ok(());
        }

        //
        // Whole catalogue
        //
        let catalogue = list_available_units(&pool.conn)?;

        if *json {
            println!("{}", serde_json::to_string_pretty(&catalogue)?);
            return Ok(());
        }

        if catalogue.is_empty() {
            info("No pending or in-progress units.");
            return Ok(());
        }

        for (group, units) in &catalogue {
            header(group);
            let mut table = Table::new(vec!["Unit", "Name", "Estimate", "Status"]);
            for u in units {
                table.add_row(vec![
                    u.unit.to_string(),
                    u.display_name.clone(),
                    hours_cell(u.estimated_hours),
                    u.status.label().to_string(),
                ]);
            }
            println!("{}", table.render());
        }
    }

    Ok(())
}
