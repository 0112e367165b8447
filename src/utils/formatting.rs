//! Formatting utilities used for CLI outputs.

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Pad to a display width, counting wide characters correctly.
pub fn pad_right(s: &str, width: usize) -> String {
    let w = UnicodeWidthStr::width(s);
    format!("{}{}", s, " ".repeat(width.saturating_sub(w)))
}

/// Cut to `max` display columns, ending with `…` when something was dropped.
pub fn truncate(s: &str, max: usize) -> String {
    if UnicodeWidthStr::width(s) <= max {
        return s.to_string();
    }

    let mut out = String::new();
    let mut used = 0;
    for c in s.chars() {
        let w = UnicodeWidthChar::width(c).unwrap_or(0);
        if used + w + 1 > max {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push('…');
    out
}

pub fn money(v: f64) -> String {
    format!("{:.2} $", v)
}

pub fn percent(v: f64) -> String {
    let sign = if v > 0.0 { "+" } else { "" };
    format!("{sign}{:.1}%", v)
}

/// `None` and blank strings render as `--`.
pub fn or_dash(v: &Option<String>) -> String {
    match v {
        Some(s) if !s.trim().is_empty() => s.clone(),
        _ => "--".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padding_counts_display_width() {
        assert_eq!(pad_right("ab", 4), "ab  ");
        assert_eq!(pad_right("Étape", 6), "Étape ");
    }

    #[test]
    fn truncate_keeps_short_text_and_cuts_by_width() {
        assert_eq!(truncate("Welding", 10), "Welding");
        assert_eq!(truncate("Assemble frame", 8), "Assembl…");
        assert_eq!(UnicodeWidthStr::width(truncate("溶接溶接溶接", 5).as_str()), 5);
    }

    #[test]
    fn helpers() {
        assert_eq!(money(50.0), "50.00 $");
        assert_eq!(percent(12.345), "+12.3%");
        assert_eq!(percent(-4.0), "-4.0%");
        assert_eq!(or_dash(&None), "--");
    }
}
