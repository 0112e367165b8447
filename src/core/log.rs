use crate::db::log::load_log;
use crate::errors::AppResult;
use ansi_term::Colour;
use regex::Regex;
use rusqlite::Connection;
use unicode_width::UnicodeWidthStr;

const OP_TARGET_MAX: usize = 60;

fn strip_ansi(s: &str) -> String {
    match Regex::new(r"\x1B\[[0-9;]*[mK]") {
        Ok(re) => re.replace_all(s, "").into_owned(),
        Err(_) => s.to_string(),
    }
}

/// ANSI colour of an audit operation.
fn color_for_operation(op: &str) -> Colour {
    match op {
        "punch_in" => Colour::Green,
        "punch_out" => Colour::Cyan,
        "progress" => Colour::Yellow,
        "purge" => Colour::Red,
        "detach" | "promote" => Colour::Yellow,
        "restore" => Colour::Blue,
        "migration_applied" => Colour::Purple,
        "init" => Colour::RGB(255, 153, 51),
        _ => Colour::White,
    }
}

/// `operation (target)`, cut to [`OP_TARGET_MAX`] visible characters with
/// only the operation word coloured.
fn render_op_target(operation: &str, target: &str) -> String {
    let plain = if target.is_empty() {
        operation.to_string()
    } else {
        format!("{operation} ({target})")
    };

    let visible = if plain.chars().count() > OP_TARGET_MAX {
        let mut s: String = plain.chars().take(OP_TARGET_MAX - 3).collect();
        s.push_str("...");
        s
    } else {
        plain
    };

    let color = color_for_operation(operation);
    match visible.split_once(' ') {
        Some((op_word, rest)) => format!("{} {}", color.paint(op_word), rest),
        None => color.paint(visible.as_str()).to_string(),
    }
}

pub struct LogLogic;

impl LogLogic {
    pub fn print_log(conn: &Connection) -> AppResult<()> {
        let entries = load_log(conn)?;

        if entries.is_empty() {
            println!("📜 Internal log is empty.");
            return Ok(());
        }

        let rows: Vec<(i64, String, String, String)> = entries
            .into_iter()
            .map(|(id, raw_date, operation, target, message)| {
                let date = chrono::DateTime::parse_from_rfc3339(&raw_date)
                    .map(|dt| dt.format("%FT%T%:z").to_string())
                    .unwrap_or(raw_date);
                (id, date, render_op_target(&operation, &target), message)
            })
            .collect();

        let id_w = rows.iter().map(|r| r.0.to_string().len()).max().unwrap_or(1);
        let date_w = rows.iter().map(|r| r.1.width()).max().unwrap_or(10);
        let op_w = rows
            .iter()
            .map(|r| strip_ansi(&r.2).width())
            .max()
            .unwrap_or(10)
            .min(OP_TARGET_MAX);

        println!("📜 Internal log:\n");

        for (id, date, op_target, message) in rows {
            let padding = " ".repeat(op_w.saturating_sub(strip_ansi(&op_target).width()));
            println!(
                "{:>id_w$}: {:<date_w$} | {}{} => {}",
                id,
                date,
                op_target,
                padding,
                message,
                id_w = id_w,
                date_w = date_w
            );
        }

        Ok(())
    }
}
