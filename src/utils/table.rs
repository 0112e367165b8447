//! Table rendering utilities for CLI outputs.

use super::formatting::{pad_right, truncate};
use unicode_width::UnicodeWidthStr;

const MAX_CELL: usize = 48;

pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new<S: Into<String>>(headers: Vec<S>) -> Self {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn add_row(&mut self, row: Vec<String>) {
        self.rows.push(row.into_iter().map(|c| truncate(&c, MAX_CELL)).collect());
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn widths(&self) -> Vec<usize> {
        self.headers
            .iter()
            .enumerate()
            .map(|(i, h)| {
                self.rows
                    .iter()
                    .filter_map(|r| r.get(i))
                    .map(|c| UnicodeWidthStr::width(c.as_str()))
                    .chain(std::iter::once(UnicodeWidthStr::width(h.as_str())))
                    .max()
                    .unwrap_or(0)
            })
            .collect()
    }

    pub fn render(&self) -> String {
        let widths = self.widths();
        let mut out = String::new();

        // Header
        for (h, w) in self.headers.iter().zip(&widths) {
            out.push_str(&pad_right(h, *w));
            out.push_str("  ");
        }
        out.push('\n');
        for w in &widths {
            out.push_str(&"-".repeat(*w));
            out.push_str("  ");
        }
        out.push('\n');

        // Rows
        for row in &self.rows {
            for (i, w) in widths.iter().enumerate() {
                let cell = row.get(i).map(String::as_str).unwrap_or("");
                out.push_str(&pad_right(cell, *w));
                out.push_str("  ");
            }
            out.push('\n');
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn columns_grow_to_content() {
        let mut t = Table::new(vec!["ID", "Name"]);
        t.add_row(vec!["1".into(), "Welding".into()]);
        let out = t.render();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0].trim_end(), "ID  Name");
        assert_eq!(lines[2].trim_end(), "1   Welding");
    }
}
