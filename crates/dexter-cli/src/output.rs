//! Output dispatcher: selects raw-JSON, verbose-tree, or table rendering
//! for an API response and maps the status to a process exit code.

use anyhow::anyhow;
use dexter_render::{Sink, Table, render_table, render_verbose};
use reqwest::StatusCode;
use serde_json::Value;

use crate::client::{ApiResponse, CliError, CliResult, EX_IOERR, EX_OK};
use crate::config::Profile;

/// Write the response through `sink` and return the process exit code.
///
/// Rendering selection, in order: suppressed entirely when quiet (unless
/// debug); status/reason preamble for non-200 or debug; `Location` header
/// echo; then verbose tree (with single-key collection unwrap), table, or
/// raw JSON depending on the body, the supplied table, and display flags.
pub(crate) fn display_response(
    profile: &Profile,
    response: &ApiResponse,
    table: Option<&Table>,
    sink: &mut dyn Sink,
) -> CliResult<i32> {
    if profile.debug || !profile.quiet {
        if response.status != StatusCode::OK || profile.debug {
            sink.write_text(&format!(
                "{} {}\n",
                response.status.as_u16(),
                response.reason()
            ))?;
        }
        if let Some(location) = &response.location {
            sink.write_text(&format!("Location: {location}\n"))?;
        }

        if !response.body.is_empty() && (profile.verbose || table.is_none()) && !profile.json {
            let data = unwrap_collection(response.json()?, &profile.unwrap_keys);
            if is_empty_value(&data) {
                sink.write_text("No results\n")?;
            } else {
                let mut text = String::new();
                render_verbose(&data, &mut text);
                text.push('\n');
                sink.write_text(&text)?;
            }
        } else if let Some(table) = table
            && !profile.json
        {
            let mut text = String::new();
            render_table(table, profile.width, &mut text)?;
            sink.write_text(&text)?;
        } else if !response.body.is_empty() {
            let mut text = serde_json::to_string_pretty(&response.json()?)
                .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))?;
            text.push('\n');
            sink.write_text(&text)?;
        }
    }

    Ok(if response.status.is_success() {
        EX_OK
    } else {
        EX_IOERR
    })
}

/// Unwrap a single-key object whose only key is a known collection key.
fn unwrap_collection(data: Value, unwrap_keys: &[String]) -> Value {
    let unwrappable = matches!(
        &data,
        Value::Object(map) if map.len() == 1
            && map.keys().all(|key| unwrap_keys.iter().any(|unwrap| unwrap == key))
    );
    if unwrappable && let Value::Object(map) = data {
        map.into_iter().next().map_or(Value::Null, |(_, value)| value)
    } else {
        data
    }
}

/// Structurally empty values render as "No results" instead of nothing.
fn is_empty_value(data: &Value) -> bool {
    match data {
        Value::Null => true,
        Value::String(text) => text.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(entries) => entries.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}
