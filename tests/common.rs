#![allow(dead_code)]
use assert_cmd::{Command, cargo_bin_cmd};
use chrono::NaiveDateTime;
use optracker::config::Config;
use optracker::db::pool::DbPool;
use optracker::utils::time::parse_ts;
use rusqlite::{Connection, params};
use std::env;
use std::fs;
use std::path::PathBuf;

pub fn opt() -> Command {
    cargo_bin_cmd!("optracker")
}

/// Create a unique test DB path inside the system temp dir and remove any existing file
pub fn setup_test_db(name: &str) -> String {
    let mut path: PathBuf = env::temp_dir();
    path.push(format!("{}_optracker.sqlite", name));
    let db_path = path.to_string_lossy().to_string();
    fs::remove_file(&db_path).ok();
    db_path
}

/// Fresh, empty directory under the system temp dir.
pub fn temp_dir(name: &str) -> PathBuf {
    let mut path: PathBuf = env::temp_dir();
    path.push(format!("{}_optracker_dir", name));
    fs::remove_dir_all(&path).ok();
    path
}

/// Open a migrated database at a fresh temp path.
pub fn open_db(name: &str) -> (DbPool, Config) {
    let db_path = setup_test_db(name);
    let pool = DbPool::open(&db_path).expect("open db");
    (pool, Config::with_database(&db_path))
}

/// Timestamp in storage format (`2025-03-03T08:00:00`).
pub fn ts(s: &str) -> NaiveDateTime {
    parse_ts(s).expect("timestamp")
}

// ----------------------------------------------------------------------
// Directory seeding
// ----------------------------------------------------------------------

pub fn add_employee(conn: &Connection, id: i64, first: &str, last: &str, salary: Option<f64>) {
    conn.execute(
        "INSERT INTO employees (id, first_name, last_name, role, status, annual_salary)
         VALUES (?1, ?2, ?3, 'Welder', 'ACTIVE', ?4)",
        params![id, first, last, salary],
    )
    .expect("insert employee");
}

pub fn add_project(conn: &Connection, id: i64, name: &str) {
    conn.execute(
        "INSERT INTO projects (id, name, status) VALUES (?1, ?2, 'IN_PROGRESS')",
        params![id, name],
    )
    .expect("insert project");
}

pub fn add_work_center(conn: &Connection, id: i64, name: &str) {
    conn.execute(
        "INSERT INTO work_centers (id, name, department) VALUES (?1, ?2, 'Production')",
        params![id, name],
    )
    .expect("insert work center");
}

pub fn add_operation(
    conn: &Connection,
    id: i64,
    project_id: Option<i64>,
    seq: i64,
    description: &str,
    estimated_hours: Option<f64>,
    status: &str,
) {
    conn.execute(
        "INSERT INTO operations
            (id, project_id, sequence_number, description, estimated_hours, status)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![id, project_id, seq, description, estimated_hours, status],
    )
    .expect("insert operation");
}

pub fn add_work_order(
    conn: &Connection,
    id: i64,
    doc: &str,
    status: &str,
    project_id: Option<i64>,
    metadata: Option<&str>,
) {
    conn.execute(
        "INSERT INTO work_orders (id, doc_number, status, project_id, metadata)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![id, doc, status, project_id, metadata],
    )
    .expect("insert work order");
}

pub fn add_line(
    conn: &Connection,
    id: i64,
    work_order_id: i64,
    seq: i64,
    description: &str,
    estimate: Option<f64>,
    notes: Option<&str>,
) {
    conn.execute(
        "INSERT INTO work_order_lines
            (id, work_order_id, sequence_number, description, estimated_value, notes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![id, work_order_id, seq, description, estimate, notes],
    )
    .expect("insert work order line");
}

/// Closed session written straight to storage, bypassing the punch rules.
pub fn add_closed_session(
    conn: &Connection,
    employee_id: i64,
    operation_id: Option<i64>,
    punch_in: &str,
    punch_out: &str,
    hours: f64,
    rate: f64,
) -> i64 {
    conn.execute(
        "INSERT INTO time_entries
            (employee_id, operation_id, punch_in, punch_out, total_hours,
             hourly_rate, total_cost, notes, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, '', ?3)",
        params![employee_id, operation_id, punch_in, punch_out, hours, rate, hours * rate],
    )
    .expect("insert closed session");
    conn.last_insert_rowid()
}

pub fn add_open_session(conn: &Connection, employee_id: i64, punch_in: &str) -> i64 {
    conn.execute(
        "INSERT INTO time_entries (employee_id, punch_in, notes, created_at)
         VALUES (?1, ?2, '', ?2)",
        params![employee_id, punch_in],
    )
    .expect("insert open session");
    conn.last_insert_rowid()
}

pub fn count_rows(conn: &Connection, sql_filter: &str) -> i64 {
    conn.query_row(
        &format!("SELECT COUNT(*) FROM time_entries WHERE {sql_filter}"),
        [],
        |row| row.get(0),
    )
    .expect("count rows")
}

/// Small shop: two employees, one project, one operation with a 10 h
/// estimate and a work order with one task line and one material line.
pub fn seed_shop(conn: &Connection) {
    add_employee(conn, 1, "Ada", "Lovelace", Some(52_000.0));
    add_employee(conn, 2, "Bob", "Marley", None);
    add_project(conn, 10, "Frame line");
    add_work_center(conn, 5, "Robot cell");
    add_operation(conn, 1, Some(10), 1, "Cut tubes", Some(10.0), "TODO");
    add_work_order(conn, 7, "WO-0007", "VALIDATED", Some(10), None);
    add_line(
        conn,
        1,
        7,
        2,
        "Welding - Assemble frame",
        Some(4.0),
        Some(r#"{"operation": "Robot cell"}"#),
    );
    add_line(conn, 2, 7, 1001, "MATERIAU: steel tube", Some(12.0), None);
}
