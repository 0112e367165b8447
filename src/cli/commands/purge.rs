use crate::cli::parser::{Commands, PurgeScope};
use crate::config::Config;
use crate::core::backup::{BackupMode, read_snapshot, restore_snapshot};
use crate::core::purge;
use crate::db::pool::DbPool;
use crate::errors::AppResult;
use crate::models::purge::PurgeOutcome;
use crate::ui::messages::{field, info, success, warning};
use crate::utils::date::parse_range;
use crate::utils::path::expand_tilde;

use std::io::{self, Write};
use std::path::Path;

/// Ask a yes/no confirmation from the user
fn ask_confirmation(prompt: &str) -> bool {
    warning(prompt);
    print!("Confirm [y/N]: ");
    let _ = io::stdout().flush();

    let mut s = String::new();
    if io::stdin().read_line(&mut s).is_ok() {
        matches!(s.trim().to_lowercase().as_str(), "y" | "yes")
    } else {
        false
    }
}

fn prompt_for(scope: &PurgeScope) -> String {
    match scope {
        PurgeScope::All => "Delete EVERY punch session?".to_string(),
        PurgeScope::Range { range } => format!("Delete sessions punched in during {range}?"),
        PurgeScope::Employee { id } => format!("Delete every session of employee {id}?"),
        PurgeScope::OlderThan { days } => {
            format!("Delete closed sessions older than {days} days?")
        }
        PurgeScope::Orphans => "Delete sessions pointing at deleted records?".to_string(),
        PurgeScope::Restore { file } => format!("Restore sessions from {file}?"),
    }
}

fn report(outcome: &PurgeOutcome) {
    success(&outcome.message);
    if let Some(o) = &outcome.orphans {
        field("  employees", o.employee);
        field("  projects", o.project);
        field("  operations", o.operation);
        field("  work orders", o.work_order);
    }
    if let Some(path) = &outcome.backup_path {
        info(format!("Backup written to {path}"));
    }
}

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::Purge { scope, backup, yes } = cmd {
        let prompt = format!("{} This action is irreversible.", prompt_for(scope));
        if !*yes && !ask_confirmation(&prompt) {
            info("Operation cancelled.");
            return Ok(());
        }

        let pool = DbPool::open(&cfg.database)?;
        let conn = &pool.conn;

        let backup_dir = expand_tilde(&cfg.backup_dir);
        let mode = if *backup {
            BackupMode::File {
                dir: &backup_dir,
                compress: cfg.compress_backups,
            }
        } else {
            BackupMode::Skip
        };

        let outcome = match scope {
            PurgeScope::All => purge::purge_all(conn, mode)?,
            PurgeScope::Range { range } => {
                let (start, end) = parse_range(range)?;
                purge::purge_by_date_range(conn, start, end, mode)?
            }
            PurgeScope::Employee { id } => purge::purge_by_employee(conn, *id, mode)?,
            PurgeScope::OlderThan { days } => {
                purge::purge_completed_older_than(conn, *days, mode)?
            }
            PurgeScope::Orphans => purge::purge_orphaned(conn, mode)?,
            PurgeScope::Restore { file } => {
                let snapshot = read_snapshot(Path::new(file))?;
                let restored = restore_snapshot(conn, &snapshot)?;
                success(format!(
                    "{restored} of {} entries restored ({} backup of {})",
                    snapshot.entries.len(),
                    snapshot.scope,
                    snapshot.created_at
                ));
                return Ok(());
            }
        };

        report(&outcome);
    }

    Ok(())
}
