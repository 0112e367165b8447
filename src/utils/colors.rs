/// ANSI color helper utilities for terminal output.
pub const RESET: &str = "\x1b[0m";

pub const GREY: &str = "\x1b[90m";

pub const RED: &str = "\x1b[31m";
pub const GREEN: &str = "\x1b[32m";

pub const YELLOW: &str = "\x1b[33m";
pub const CYAN: &str = "\x1b[36m";

/// Variance color: over estimate → red, under → green.
pub fn color_for_variance(value: Option<f64>) -> &'static str {
    match value {
        Some(v) if v > 10.0 => RED,
        Some(v) if v < -10.0 => GREEN,
        Some(_) => RESET,
        None => GREY,
    }
}

/// Open sessions are highlighted, closed ones printed plain.
pub fn color_for_open(open: bool) -> &'static str {
    if open { YELLOW } else { RESET }
}
