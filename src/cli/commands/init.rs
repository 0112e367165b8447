use crate::config::Config;
use crate::db::log;
use crate::errors::AppResult;

use crate::cli::parser::Cli;
use crate::db::initialize::init_db;
use crate::db::pool::DbPool;
use crate::ui::messages::{success, warning};

/// Handle the `init` command
///
/// This initializes:
///  - the config directory (if missing)
///  - the configuration file
///  - the SQLite database (prod or test mode)
///  - all pending DB migrations
pub fn handle(cli: &Cli) -> AppResult<()> {
    let cfg = Config::init_all(cli.db.clone(), cli.test)?;
    let db_path = cfg.database.clone();

    println!("⚙️  Initializing optracker…");
    if !cli.test {
        println!("📄 Config file : {}", Config::config_file().display());
    }
    println!("🗄️  Database   : {}", &db_path);

    // Tables, indexes and every pending migration.
    let pool = DbPool::new(&db_path)?;
    for (version, message) in init_db(&pool.conn)? {
        success(format!("Migration applied: {version} → {message}"));
    }

    success(format!("Database initialized at {}", &db_path));

    if let Err(e) = log::ttlog(
        &pool.conn,
        "init",
        "Database initialized",
        &format!("Database initialized at {}", &db_path),
    ) {
        warning(format!("Failed to write internal log: {}", e));
    }

    println!("🎉 optracker initialization completed!");
    Ok(())
}
