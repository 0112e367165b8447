use crate::cli::parser::Commands;
use crate::config::Config;
use crate::db::migrate::{applied_versions, run_pending_migrations};
use crate::db::pool::DbPool;
use crate::db::stats;
use crate::errors::AppResult;
use crate::ui::messages::success;
use crate::utils::colors::{CYAN, GREEN, RED, RESET};

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::Db {
        migrate,
        check,
        vacuum,
        info,
    } = cmd
    {
        // Opened without migrating so `--migrate` reports what it applies.
        let pool = DbPool::new(&cfg.database)?;

        //
        // 1) MIGRATE
        //
        if *migrate {
            println!("{}▶ Running migrations…{}", CYAN, RESET);
            let applied = run_pending_migrations(&pool.conn)?;
            for (version, message) in &applied {
                success(format!("Migration applied: {version} → {message}"));
            }
            if applied.is_empty() {
                println!("   Schema already up to date:");
                for v in applied_versions(&pool.conn)? {
                    println!("   {v}");
                }
            }
            println!("{}✔ Migration completed.{}\n", GREEN, RESET);
        }

        //
        // 2) INFO
        //
        if *info {
            run_pending_migrations(&pool.conn)?;
            stats::print_db_info(&pool.conn, &cfg.database)?;
        }

        //
        // 3) CHECK
        //
        if *check {
            println!("{}▶ Running integrity check…{}", CYAN, RESET);

            let integrity: String = pool
                .conn
                .query_row("PRAGMA integrity_check;", [], |row| row.get(0))?;

            if integrity == "ok" {
                println!("{}✔ Integrity check passed.{}\n", GREEN, RESET);
            } else {
                println!("{}✘ Integrity check failed:{} {}\n", RED, RESET, integrity);
            }
        }

        //
        // 4) VACUUM
        //
        if *vacuum {
            println!("{}▶ Running VACUUM…{}", CYAN, RESET);
            pool.conn.execute_batch("VACUUM;")?;
            println!("{}✔ Vacuum completed.{}\n", GREEN, RESET);
        }
    }

    Ok(())
}
