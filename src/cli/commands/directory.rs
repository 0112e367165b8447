use crate::cli::parser::Commands;
use crate::config::Config;
use crate::db::directory::{list_active_employees, list_open_projects};
use crate::db::pool::DbPool;
use crate::errors::AppResult;
use crate::ui::messages::info;
use crate::utils::formatting::money;
use crate::utils::table::Table;

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::Directory { projects } = cmd {
        let pool = DbPool::open(&cfg.database)?;

        let table = if *projects {
            let mut t = Table::new(vec!["ID", "Project", "Status"]);
            for p in list_open_projects(&pool.conn)? {
                t.add_row(vec![p.id.to_string(), p.name, p.status]);
            }
            t
        } else {
            let mut t = Table::new(vec!["ID", "Employee", "Role", "Department", "Rate"]);
            for e in list_active_employees(&pool.conn)? {
                let rate = crate::core::punch::rate_for(Some(&e), cfg);
                t.add_row(vec![
                    e.id.to_string(),
                    e.display_name(),
                    e.role.clone().unwrap_or_default(),
                    e.department.clone().unwrap_or_default(),
                    format!("{}/h", money(rate)),
                ]);
            }
            t
        };

        if table.is_empty() {
            info("Nothing to list.");
        } else {
            println!("{}", table.render());
        }
    }

    Ok(())
}
