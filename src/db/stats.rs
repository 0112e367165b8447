use crate::utils::colors::{CYAN, GREEN, GREY, RESET, YELLOW};
use crate::utils::time::parse_ts;
use rusqlite::{Connection, OptionalExtension};
use std::fs;

pub fn print_db_info(conn: &Connection, db_path: &str) -> rusqlite::Result<()> {
    println!();

    //
    // 1) FILE SIZE
    //
    let file_size = fs::metadata(db_path).map(|m| m.len()).unwrap_or(0);
    let file_mb = (file_size as f64) / (1024.0 * 1024.0);

    println!("{}• File:{} {}{}{}", CYAN, RESET, YELLOW, db_path, RESET);
    println!("{}• Size:{} {:.2} MB", CYAN, RESET, file_mb);

    //
    // 2) SESSIONS
    //
    let (count, open): (i64, i64) = conn.query_row(
        "SELECT COUNT(*), COUNT(*) - COUNT(punch_out) FROM time_entries",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    println!(
        "{}• Total sessions:{} {}{}{} ({} open)",
        CYAN, RESET, GREEN, count, RESET, open
    );

    //
    // 3) DATE RANGE
    //
    let first: Option<String> = conn
        .query_row(
            "SELECT punch_in FROM time_entries ORDER BY punch_in ASC LIMIT 1",
            [],
            |row| row.get(0),
        )
        .optional()?;
    let last: Option<String> = conn
        .query_row(
            "SELECT punch_in FROM time_entries ORDER BY punch_in DESC LIMIT 1",
            [],
            |row| row.get(0),
        )
        .optional()?;

    let dash = format!("{GREY}--{RESET}");
    println!("{}• Punch-in range:{}", CYAN, RESET);
    println!("    from: {}", first.as_deref().unwrap_or(&dash));
    println!("    to:   {}", last.as_deref().unwrap_or(&dash));

    //
    // 4) AVERAGE SESSIONS/DAY
    //
    if let (Some(f), Some(l)) = (
        first.as_deref().and_then(parse_ts),
        last.as_deref().and_then(parse_ts),
    ) {
        let days = (l.date() - f.date()).num_days().max(1);
        let avg = count as f64 / days as f64;
        println!("{}• Average sessions/day:{} {:.2}", CYAN, RESET, avg);
    }

    //
    // 5) AUDIT ROWS
    //
    let log_rows: i64 = conn.query_row("SELECT COUNT(*) FROM log", [], |row| row.get(0))?;
    println!("{}• Audit log rows:{} {}", CYAN, RESET, log_rows);

    println!();
    Ok(())
}
