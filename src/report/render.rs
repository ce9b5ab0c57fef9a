//! Plain text rendering of a paginated report

use super::layout::{Block, Page, ReportDocument};
use std::fmt::Write;

impl ReportDocument {
    /// Render every page, each under a `=== Page N ===` separator
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        for (i, page) in self.pages.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            render_page(page, &mut out);
        }
        out
    }
}

fn render_page(page: &Page, out: &mut String) {
    let _ = writeln!(out, "=== Page {} ===", page.number);
    for placed in &page.blocks {
        match &placed.block {
            Block::Heading { text } => {
                let _ = writeln!(out, "\n{text}");
                let _ = writeln!(out, "{}", "-".repeat(text.chars().count()));
            }
            Block::KeyValueLine { key, value } => {
                let _ = writeln!(out, "{key}: {value}");
            }
            Block::Table { header, rows } => render_table(header, rows, out),
            Block::WrappedParagraph { lines, .. } => {
                for line in lines {
                    let _ = writeln!(out, "{line}");
                }
            }
            Block::DetailBlock { lines, .. } => {
                for line in lines {
                    let _ = writeln!(out, "  {line}");
                }
            }
        }
    }
}

fn render_table(header: &[String], rows: &[Vec<String>], out: &mut String) {
    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            let len = cell.chars().count();
            match widths.get_mut(i) {
                Some(w) => *w = (*w).max(len),
                None => widths.push(len),
            }
        }
    }

    let format_row = |cells: &[String]| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, &width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    out.push('\n');
    let _ = writeln!(out, "{}", format_row(header));
    let rule: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    let _ = writeln!(out, "{}", rule.join("-+-"));
    for row in rows {
        let _ = writeln!(out, "{}", format_row(row));
    }
}
