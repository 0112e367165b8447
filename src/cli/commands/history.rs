use crate::cli::parser::Commands;
use crate::config::Config;
use crate::core::reports::history;
use crate::db::pool::DbPool;
use crate::errors::AppResult;
use crate::ui::messages::info;
use crate::utils::colors::{RESET, color_for_open};
use crate::utils::formatting::{money, or_dash};
use crate::utils::table::Table;
use crate::utils::time::{format_hours, format_ts};

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::History {
        employee,
        days,
        json,
    } = cmd
    {
        let pool = DbPool::open(&cfg.database)?;
        let rows = history(&pool.conn, *employee, *days)?;

        if *json {
            println!("{}", serde_json::to_string_pretty(&rows)?);
            return Ok(());
        }

        if rows.is_empty() {
            info(format!("No punches in the last {days} days."));
            return Ok(());
        }

        let mut table = Table::new(vec![
            "#", "Employee", "Kind", "Unit", "Project", "In", "Out", "Hours", "Cost",
        ]);
        for d in &rows {
            let s = &d.session;
            table.add_row(vec![
                s.id.to_string(),
                or_dash(&d.employee_name),
                d.kind.label().to_string(),
                or_dash(&d.unit_description),
                or_dash(&d.project_name),
                format_ts(&s.punch_in),
                s.punch_out.as_ref().map(format_ts).unwrap_or_else(|| "open".into()),
                s.total_hours.map(format_hours).unwrap_or_default(),
                s.total_cost.map(money).unwrap_or_default(),
            ]);
        }

        // Open sessions stand out.
        for (line, d) in table.render().lines().zip(
            std::iter::repeat(None)
                .take(2)
                .chain(rows.iter().map(Some)),
        ) {
            let open = d.is_some_and(|d| d.session.is_open());
            println!("{}{}{}", color_for_open(open), line, RESET);
        }
    }

    Ok(())
}
