//! One-line status messages and labelled fields for command output.
//! Errors go to stderr, everything else to stdout.

use crate::utils::colors::{CYAN, GREEN, RED, RESET, YELLOW};
use std::fmt;

const BOLD: &str = "\x1b[1m";
const BLUE: &str = "\x1b[34m";

const ICON_INFO: &str = "ℹ️";
const ICON_OK: &str = "✅";
const ICON_WARN: &str = "⚠️";
const ICON_ERR: &str = "❌";

/// Width of the label column printed by [`field`].
const LABEL_WIDTH: usize = 20;

pub fn info<T: fmt::Display>(msg: T) {
    println!("{BLUE}{BOLD}{ICON_INFO}{RESET} {msg}");
}

pub fn success<T: fmt::Display>(msg: T) {
    println!("{GREEN}{BOLD}{ICON_OK}{RESET} {msg}");
}

pub fn warning<T: fmt::Display>(msg: T) {
    println!("{YELLOW}{BOLD}{ICON_WARN}{RESET} {msg}");
}

pub fn error<T: fmt::Display>(msg: T) {
    eprintln!("{RED}{BOLD}{ICON_ERR}{RESET} {msg}");
}

pub fn header<T: fmt::Display>(msg: T) {
    let title = msg.to_string();
    println!("{BLUE}{BOLD}{title}{RESET}");
    println!("{BLUE}{}{RESET}", "─".repeat(title.chars().count().max(8)));
}

/// `label:   value` with the label padded to a fixed column.
pub fn field<T: fmt::Display>(label: &str, value: T) {
    let label = format!("{label}:");
    println!("{CYAN}{label:<LABEL_WIDTH$}{RESET} {value}");
}
