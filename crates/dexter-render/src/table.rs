//! Column-aligned table layout with iterative width fitting.
//!
//! Header cells carry a mini-grammar `[minWidth]alignChar[label]` with
//! alignment `<` (left), `>` (right), or `^` (center). A table wider than
//! the target first collapses its decorative `-|-` separator to a bare
//! `|`, then shrinks columns from the rightmost inward, never below a
//! column's declared minimum width. Overflow that cannot be reclaimed is
//! accepted rather than dropping data.

use std::sync::LazyLock;

use regex::Regex;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::error::RenderError;

/// Decorative column separator used while the table fits comfortably.
const FULL_SEPARATOR: &str = "-|-";
/// Narrow separator used once horizontal space runs out.
const NARROW_SEPARATOR: &str = "|";

static COLUMN_SPEC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d*)([<>^])(.*)$").expect("column spec grammar is valid"));

/// Cell alignment within a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Alignment {
    Left,
    Right,
    Center,
}

/// Parsed form of one header cell.
#[derive(Debug, Clone)]
struct ColumnSpec {
    label: String,
    align: Alignment,
    min_width: Option<usize>,
}

/// Parse a header cell. Total: non-conforming input falls back to a
/// left-aligned column with the whole string as its label.
fn parse_column_spec(field: &str) -> ColumnSpec {
    COLUMN_SPEC.captures(field).map_or_else(
        || ColumnSpec {
            label: field.to_string(),
            align: Alignment::Left,
            min_width: None,
        },
        |caps| {
            let min_width = caps[1].parse::<usize>().ok();
            let align = match &caps[2] {
                "<" => Alignment::Left,
                ">" => Alignment::Right,
                _ => Alignment::Center,
            };
            ColumnSpec {
                label: caps[3].to_string(),
                align,
                min_width,
            }
        },
    )
}

/// A header spec plus data rows, cells already in string form.
#[derive(Debug, Clone, Default)]
pub struct Table {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Create a table from header spec cells.
    #[must_use]
    pub fn new<I, S>(header: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            header: header.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a data row.
    pub fn push_row<I, S>(&mut self, row: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rows.push(row.into_iter().map(Into::into).collect());
    }

    /// True when the table holds no data rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Render `table` into `out`, fitting it to `target_width` display columns.
///
/// Tables with no data rows render as the single line `No results`.
///
/// # Errors
///
/// Returns [`RenderError::MalformedTable`] when a data row's cell count
/// differs from the header's.
pub fn render_table(table: &Table, target_width: usize, out: &mut String) -> Result<(), RenderError> {
    if table.rows.is_empty() {
        out.push_str("No results\n");
        return Ok(());
    }

    let specs: Vec<ColumnSpec> = table
        .header
        .iter()
        .map(|field| parse_column_spec(field))
        .collect();
    let columns = specs.len();
    for (row_index, row) in table.rows.iter().enumerate() {
        if row.len() != columns {
            return Err(RenderError::MalformedTable {
                row: row_index,
                expected: columns,
                found: row.len(),
            });
        }
    }

    let mut widths: Vec<usize> = specs.iter().map(|spec| spec.label.width()).collect();
    for row in &table.rows {
        for (col, cell) in row.iter().enumerate() {
            widths[col] = widths[col].max(cell.width());
        }
    }

    let floors: Vec<usize> = specs
        .iter()
        .map(|spec| spec.min_width.unwrap_or(0))
        .collect();
    let mut sep_len = FULL_SEPARATOR.len();

    // Bounded by column count: each round either fits, collapses the
    // separator, or pins one more column at its floor.
    for _ in 0..=columns + 1 {
        let total: usize = widths.iter().sum::<usize>() + sep_len * columns.saturating_sub(1);
        if total <= target_width {
            break;
        }
        if sep_len > NARROW_SEPARATOR.len() {
            sep_len = NARROW_SEPARATOR.len();
            continue;
        }
        let overflow = total - target_width;
        let Some(col) = (0..columns).rev().find(|&col| widths[col] > floors[col]) else {
            // Nothing left to reclaim; accept the overflow.
            break;
        };
        widths[col] = widths[col].saturating_sub(overflow).max(floors[col]);
    }

    let rule_separator = if sep_len == NARROW_SEPARATOR.len() {
        NARROW_SEPARATOR
    } else {
        FULL_SEPARATOR
    };
    let gap = " ".repeat(sep_len);

    let header_cells: Vec<String> = specs
        .iter()
        .zip(&widths)
        .map(|(spec, &width)| format_cell(&spec.label, width, spec.align))
        .collect();
    out.push_str(&header_cells.join(&gap));
    out.push('\n');

    let rule: Vec<String> = widths.iter().map(|&width| "-".repeat(width)).collect();
    out.push_str(&rule.join(rule_separator));
    out.push('\n');

    for row in &table.rows {
        let cells: Vec<String> = row
            .iter()
            .zip(specs.iter().zip(&widths))
            .map(|(cell, (spec, &width))| format_cell(cell, width, spec.align))
            .collect();
        out.push_str(&cells.join(&gap));
        out.push('\n');
    }

    Ok(())
}

/// Clip `text` to at most `max_width` display columns on a char boundary.
fn truncate_display(text: &str, max_width: usize) -> &str {
    let mut used = 0;
    for (index, ch) in text.char_indices() {
        let ch_width = ch.width().unwrap_or(0);
        if used + ch_width > max_width {
            return &text[..index];
        }
        used += ch_width;
    }
    text
}

fn format_cell(text: &str, width: usize, align: Alignment) -> String {
    let clipped = truncate_display(text, width);
    let pad = width.saturating_sub(clipped.width());
    match align {
        Alignment::Left => format!("{clipped}{}", " ".repeat(pad)),
        Alignment::Right => format!("{}{clipped}", " ".repeat(pad)),
        Alignment::Center => {
            let left = pad / 2;
            format!("{}{clipped}{}", " ".repeat(left), " ".repeat(pad - left))
        }
    }
}
