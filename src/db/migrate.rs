use crate::errors::{AppError, AppResult};
use rusqlite::{Connection, OptionalExtension, Transaction, TransactionBehavior, params};
use tracing::info;

/// Ensure that the `log` table exists. It also records applied migrations.
fn ensure_log_table(conn: &Connection) -> AppResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS log (
            id        INTEGER PRIMARY KEY AUTOINCREMENT,
            date      TEXT NOT NULL,
            operation TEXT NOT NULL,
            target    TEXT DEFAULT '',
            message   TEXT NOT NULL
        );
        "#,
    )?;
    Ok(())
}

fn is_applied(conn: &Connection, version: &str) -> AppResult<bool> {
    let mut chk = conn.prepare(
        "SELECT 1 FROM log
         WHERE operation = 'migration_applied' AND target = ?1
         LIMIT 1",
    )?;
    Ok(chk.query_row([version], |_| Ok(())).optional()?.is_some())
}

/// Directory tables are owned by the surrounding ERP. They are created
/// here only when missing so the tracker can run against a blank file.
const DIRECTORY_TABLES: &str = r#"
    CREATE TABLE IF NOT EXISTS employees (
        id            INTEGER PRIMARY KEY,
        first_name    TEXT NOT NULL,
        last_name     TEXT NOT NULL DEFAULT '',
        role          TEXT,
        department    TEXT,
        status        TEXT NOT NULL DEFAULT 'ACTIVE',
        annual_salary REAL
    );

    CREATE TABLE IF NOT EXISTS projects (
        id     INTEGER PRIMARY KEY,
        name   TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'TODO'
    );

    CREATE TABLE IF NOT EXISTS work_centers (
        id         INTEGER PRIMARY KEY,
        name       TEXT NOT NULL,
        department TEXT
    );

    CREATE TABLE IF NOT EXISTS work_orders (
        id         INTEGER PRIMARY KEY,
        doc_number TEXT NOT NULL,
        status     TEXT NOT NULL DEFAULT 'DRAFT',
        project_id INTEGER,
        metadata   TEXT
    );

    CREATE TABLE IF NOT EXISTS work_order_lines (
        id              INTEGER PRIMARY KEY,
        work_order_id   INTEGER NOT NULL,
        sequence_number INTEGER NOT NULL DEFAULT 0,
        description     TEXT,
        estimated_value REAL,
        notes           TEXT
    );

    CREATE TABLE IF NOT EXISTS operations (
        id              INTEGER PRIMARY KEY,
        project_id      INTEGER,
        work_order_id   INTEGER,
        work_center_id  INTEGER,
        sequence_number INTEGER NOT NULL DEFAULT 0,
        description     TEXT,
        estimated_hours REAL,
        status          TEXT NOT NULL DEFAULT 'TODO'
    );

    CREATE INDEX IF NOT EXISTS idx_operations_status ON operations(status);
    CREATE INDEX IF NOT EXISTS idx_lines_work_order ON work_order_lines(work_order_id);
"#;

const TIME_ENTRIES: &str = r#"
    CREATE TABLE IF NOT EXISTS time_entries (
        id                 INTEGER PRIMARY KEY AUTOINCREMENT,
        employee_id        INTEGER NOT NULL,
        project_id         INTEGER,
        operation_id       INTEGER,
        work_order_id      INTEGER,
        work_order_line_id INTEGER,
        punch_in           TEXT NOT NULL,
        punch_out          TEXT,
        total_hours        REAL,
        hourly_rate        REAL,
        total_cost         REAL,
        notes              TEXT NOT NULL DEFAULT '',
        created_at         TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_time_entries_employee ON time_entries(employee_id);
    CREATE INDEX IF NOT EXISTS idx_time_entries_project ON time_entries(project_id);
    CREATE INDEX IF NOT EXISTS idx_time_entries_operation ON time_entries(operation_id);
    CREATE INDEX IF NOT EXISTS idx_time_entries_punch_in ON time_entries(punch_in);
"#;

/// At most one open session per employee, enforced by the engine.
const SINGLE_OPEN_INDEX: &str = r#"
    CREATE UNIQUE INDEX IF NOT EXISTS ux_time_entries_open
        ON time_entries(employee_id)
        WHERE punch_out IS NULL;
"#;

/// Refuse to build the unique index over data that already breaks it;
/// an operator has to close the duplicates first.
fn check_duplicate_open_sessions(conn: &Connection) -> AppResult<()> {
    let mut stmt = conn.prepare(
        "SELECT employee_id, COUNT(*) FROM time_entries
         WHERE punch_out IS NULL
         GROUP BY employee_id
         HAVING COUNT(*) > 1",
    )?;
    let dups = stmt
        .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;

    if dups.is_empty() {
        return Ok(());
    }

    let list = dups
        .iter()
        .map(|(e, n)| format!("employee {e} ({n} open)"))
        .collect::<Vec<_>>()
        .join(", ");
    Err(AppError::Migration(format!(
        "cannot enforce single open punch, duplicates found: {list}"
    )))
}

struct Migration {
    version: &'static str,
    message: &'static str,
    sql: &'static str,
    precheck: Option<fn(&Connection) -> AppResult<()>>,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: "20250301_0001_directory_tables",
        message: "Created directory tables",
        sql: DIRECTORY_TABLES,
        precheck: None,
    },
    Migration {
        version: "20250301_0002_time_entries",
        message: "Created time_entries table",
        sql: TIME_ENTRIES,
        precheck: None,
    },
    Migration {
        version: "20250412_0003_single_open_punch",
        message: "Added unique index on open punches",
        sql: SINGLE_OPEN_INDEX,
        precheck: Some(check_duplicate_open_sessions),
    },
];

/// Apply one migration unless it is already recorded. Returns whether it
/// ran. The check and the DDL share one IMMEDIATE transaction so two
/// processes opening a fresh file cannot both apply it.
fn apply(conn: &Connection, m: &Migration) -> AppResult<bool> {
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;

    if is_applied(&tx, m.version)? {
        return Ok(false);
    }

    if let Some(check) = m.precheck {
        check(&tx)?;
    }

    tx.execute_batch(m.sql)
        .map_err(|e| AppError::Migration(format!("{}: {}", m.version, e)))?;
    tx.execute(
        "INSERT INTO log (date, operation, target, message)
         VALUES (datetime('now'), 'migration_applied', ?1, ?2)",
        params![m.version, m.message],
    )?;
    tx.commit()?;

    info!(version = m.version, "migration applied");
    Ok(true)
}

/// Public entry point: run all pending migrations.
///
/// Returns `(version, message)` of each migration applied by this call,
/// leaving it to the caller whether to report them.
pub fn run_pending_migrations(conn: &Connection) -> AppResult<Vec<(&'static str, &'static str)>> {
    ensure_log_table(conn)?;

    let mut applied = Vec::new();
    for m in MIGRATIONS {
        if apply(conn, m)? {
            applied.push((m.version, m.message));
        }
    }

    Ok(applied)
}

/// Versions already recorded in the log table.
pub fn applied_versions(conn: &Connection) -> AppResult<Vec<String>> {
    ensure_log_table(conn)?;
    let mut stmt = conn.prepare(
        "SELECT target FROM log WHERE operation = 'migration_applied' ORDER BY id ASC",
    )?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_run_applies_nothing() {
        let conn = Connection::open_in_memory().unwrap();
        let first = run_pending_migrations(&conn).unwrap();
        assert_eq!(first.len(), MIGRATIONS.len());
        assert!(run_pending_migrations(&conn).unwrap().is_empty());
        assert_eq!(applied_versions(&conn).unwrap().len(), MIGRATIONS.len());
    }

    #[test]
    fn concurrent_openers_record_each_migration_once() {
        use crate::db::pool::DbPool;
        use std::sync::{Arc, Barrier};
        use std::{env, fs, thread};

        let path = env::temp_dir().join("migrate_race_optracker.sqlite");
        fs::remove_file(&path).ok();
        let path = path.to_string_lossy().to_string();

        let barrier = Arc::new(Barrier::new(4));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let barrier = Arc::clone(&barrier);
                let path = path.clone();
                thread::spawn(move || {
                    let pool = DbPool::new(&path).unwrap();
                    barrier.wait();
                    run_pending_migrations(&pool.conn).unwrap().len()
                })
            })
            .collect();
        let applied: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

        assert_eq!(applied, MIGRATIONS.len());
        let conn = Connection::open(&path).unwrap();
        assert_eq!(applied_versions(&conn).unwrap().len(), MIGRATIONS.len());
        fs::remove_file(&path).ok();
    }
}
