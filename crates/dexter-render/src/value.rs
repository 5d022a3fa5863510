//! Verbose tree renderer for arbitrary JSON values.
//!
//! Produces the human-readable indented form used by most commands:
//! scalars inline, containers one child per line, four spaces per nesting
//! level. Object key order follows the source document.

use serde_json::Value;

const INDENT_STEP: &str = "    ";

/// Render `value` as an indented tree, appending to `out`.
///
/// Containers never emit a trailing newline after their last child; the
/// caller terminates the block. Empty containers emit nothing at all.
pub fn render_verbose(value: &Value, out: &mut String) {
    render_at(value, "", out);
}

fn render_at(value: &Value, indent: &str, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(flag) => out.push_str(if *flag { "true" } else { "false" }),
        Value::Number(number) => out.push_str(&format_number(number)),
        Value::String(text) => {
            if text.chars().any(char::is_control) {
                out.push_str(&format!("{text:?}"));
            } else {
                out.push_str(text);
            }
        }
        Value::Array(items) => {
            if items.is_empty() {
                return;
            }
            // Opening a nested block: children start on their own line.
            if !indent.is_empty() {
                out.push('\n');
            }
            let child_indent = format!("{indent}{INDENT_STEP}");
            for (row, item) in items.iter().enumerate() {
                out.push_str(indent);
                render_at(item, &child_indent, out);
                if row + 1 < items.len() {
                    out.push('\n');
                }
            }
        }
        Value::Object(entries) => {
            if entries.is_empty() {
                return;
            }
            if !indent.is_empty() {
                out.push('\n');
            }
            let child_indent = format!("{indent}{INDENT_STEP}");
            for (row, (key, item)) in entries.iter().enumerate() {
                out.push_str(indent);
                out.push_str(key);
                out.push_str(": ");
                render_at(item, &child_indent, out);
                if row + 1 < entries.len() {
                    out.push('\n');
                }
            }
        }
    }
}

/// Format a JSON number with locale-free thousands grouping.
///
/// Grouping applies to the integer digits only; sign, fraction, and
/// exponent pass through untouched (`-1234567.5` becomes `-1,234,567.5`).
#[must_use]
pub fn format_number(number: &serde_json::Number) -> String {
    group_thousands(&number.to_string())
}

fn group_thousands(decimal: &str) -> String {
    let (sign, rest) = decimal
        .strip_prefix('-')
        .map_or(("", decimal), |stripped| ("-", stripped));
    let digits_end = rest
        .find(|ch: char| !ch.is_ascii_digit())
        .unwrap_or(rest.len());
    let (int_part, tail) = rest.split_at(digits_end);

    let mut grouped = String::with_capacity(decimal.len() + int_part.len() / 3);
    grouped.push_str(sign);
    for (offset, ch) in int_part.chars().enumerate() {
        if offset > 0 && (int_part.len() - offset) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped.push_str(tail);
    grouped
}
