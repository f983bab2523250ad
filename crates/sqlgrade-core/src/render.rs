//! Deterministic text rendering of statement results.
//!
//! Rendering is part of the comparison contract: golden results computed at
//! authoring time and student results computed at grading time go through
//! exactly this code with the same [`RenderOptions`].

use rusqlite::types::ValueRef;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderOptions {
    #[serde(default = "default_max_rows")]
    pub max_rows: usize,
    #[serde(default = "default_max_width")]
    pub max_width: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            max_rows: default_max_rows(),
            max_width: default_max_width(),
        }
    }
}

fn default_max_rows() -> usize {
    40
}

fn default_max_width() -> usize {
    80
}

/// Runs one statement and renders its result set. Statements without a
/// result set render as the empty string.
pub fn run_statement(
    conn: &Connection,
    sql: &str,
    opts: &RenderOptions,
) -> rusqlite::Result<String> {
    let mut stmt = conn.prepare(sql)?;
    if stmt.column_count() == 0 {
        stmt.execute([])?;
        return Ok(String::new());
    }

    let header: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
    let width = header.len();
    let mut rows = stmt.query([])?;
    let mut cells: Vec<Vec<String>> = Vec::new();
    let mut total = 0usize;
    while let Some(row) = rows.next()? {
        total += 1;
        if cells.len() >= opts.max_rows {
            continue;
        }
        let mut line = Vec::with_capacity(width);
        for i in 0..width {
            line.push(format_value(row.get_ref(i)?));
        }
        cells.push(line);
    }

    Ok(render_table(&header, &cells, total, opts))
}

pub fn format_value(v: ValueRef<'_>) -> String {
    match v {
        ValueRef::Null => "NULL".into(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => format_real(f),
        ValueRef::Text(t) => String::from_utf8_lossy(t)
            .replace('\n', "\\n")
            .replace('\r', "\\r"),
        ValueRef::Blob(b) => format!("x'{}'", hex::encode(b)),
    }
}

fn format_real(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{:.1}", f)
    } else {
        f.to_string()
    }
}

fn truncate(cell: &str, max_width: usize) -> String {
    if cell.chars().count() <= max_width {
        return cell.to_string();
    }
    let keep = max_width.saturating_sub(1);
    let mut out: String = cell.chars().take(keep).collect();
    out.push('…');
    out
}

pub fn render_table(
    header: &[String],
    rows: &[Vec<String>],
    total_rows: usize,
    opts: &RenderOptions,
) -> String {
    let header: Vec<String> = header.iter().map(|h| truncate(h, opts.max_width)).collect();
    let rows: Vec<Vec<String>> = rows
        .iter()
        .map(|r| r.iter().map(|c| truncate(c, opts.max_width)).collect())
        .collect();

    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for r in &rows {
        for (w, c) in widths.iter_mut().zip(r) {
            *w = (*w).max(c.chars().count());
        }
    }

    let rule = |l: char, m: char, r: char| {
        let inner = widths
            .iter()
            .map(|w| "─".repeat(w + 2))
            .collect::<Vec<_>>()
            .join(&m.to_string());
        format!("{l}{inner}{r}\n")
    };
    let line = |cells: &[String]| {
        let inner = cells
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!(" {}{} ", c, " ".repeat(w - c.chars().count())))
            .collect::<Vec<_>>()
            .join("│");
        format!("│{inner}│\n")
    };

    let mut out = String::new();
    out.push_str(&rule('┌', '┬', '┐'));
    out.push_str(&line(&header));
    out.push_str(&rule('├', '┼', '┤'));
    for r in &rows {
        out.push_str(&line(r));
    }
    out.push_str(&rule('└', '┴', '┘'));
    if total_rows > rows.len() {
        out.push_str(&format!("({} rows, {} shown)\n", total_rows, rows.len()));
    }
    out
}
