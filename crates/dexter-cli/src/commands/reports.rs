//! Handlers for the report commands: list, queue, update, status, delete,
//! and fetch.

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::anyhow;
use chrono::NaiveDateTime;
use dexter_render::{Sink, Table, format_number};
use reqwest::{Method, StatusCode};
use serde_json::{Value, json};

use crate::cli::{ListArgs, QueueArgs, ReportArgs, StatusFilter, UpdateArgs};
use crate::client::{ApiClient, CliError, CliResult, EX_IOERR};
use crate::config::Profile;
use crate::output::display_response;

const REPORTS_BASE: &str = "reports/";

/// Header spec for the report listing table.
const LIST_HEADER: [&str; 5] = ["20<URL", ">Pri", "4^Status", ">Pages", ">Age"];

pub(crate) async fn list(
    client: &ApiClient,
    profile: &Profile,
    args: ListArgs,
    sink: &mut dyn Sink,
) -> CliResult<i32> {
    let ListArgs { user, status } = args;
    let mut statuses: BTreeSet<&'static str> =
        status.into_iter().map(StatusFilter::api_name).collect();
    if statuses.contains("all") {
        statuses.clear();
    } else if statuses.remove("incomplete") {
        statuses.extend(["queued", "running", "callback"]);
    }

    let mut query: Vec<(String, String)> = statuses
        .into_iter()
        .map(|status| ("status".to_string(), status.to_string()))
        .collect();
    if let Some(user) = user {
        query.push(("user".to_string(), user));
    }

    let response = client.send(Method::GET, None, "reports", &query, None).await?;

    let mut reports: Vec<Value> = response
        .json()
        .ok()
        .and_then(|body| body.get("reports").cloned())
        .map_or_else(Vec::new, |collection| match collection {
            Value::Object(entries) => entries.into_iter().map(|(_, report)| report).collect(),
            Value::Array(items) => items,
            _ => Vec::new(),
        });
    reports.sort_by_key(sort_key);

    let mut table = Table::new(LIST_HEADER);
    for report in &reports {
        table.push_row(report_row(report));
    }

    display_response(profile, &response, Some(&table), sink)
}

/// Running and callback reports sort ahead of queued ones; higher priority
/// and earlier queue time win within a status.
fn sort_key(report: &Value) -> (i64, i64, String) {
    let status_rank = match report.get("status").and_then(Value::as_str) {
        Some("running") => 0,
        Some("queued") => 2,
        Some("complete") => 3,
        _ => 1,
    };
    let priority = report.get("priority").and_then(Value::as_i64).unwrap_or(0);
    let queued = report
        .get("queued")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    (status_rank, -priority, queued)
}

fn report_row(report: &Value) -> [String; 5] {
    let status = report.get("status").and_then(Value::as_str).unwrap_or("");
    let pages = grouped_count(report, "pages");
    let requested = grouped_count(report, "requestedPages");
    let pages_cell = match status {
        "queued" => requested,
        "running" => format!("{pages}/{requested}"),
        _ => pages,
    };
    let age = report
        .get("queued")
        .and_then(Value::as_str)
        .and_then(parse_date)
        .map_or_else(String::new, age_cell);
    [
        report
            .get("url")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string(),
        report
            .get("priority")
            .and_then(Value::as_i64)
            .unwrap_or(0)
            .to_string(),
        status.to_string(),
        pages_cell,
        age,
    ]
}

fn grouped_count(report: &Value, key: &str) -> String {
    report
        .get(key)
        .and_then(Value::as_number)
        .map_or_else(|| "0".to_string(), format_number)
}

/// Parse a Dexter date (ISO 8601 UTC, fractional seconds optional).
fn parse_date(text: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.fZ")
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%SZ"))
        .ok()
}

/// Compact age of a queue timestamp: `42s`, `5m`, `3h`, `12d`.
fn age_cell(queued: NaiveDateTime) -> String {
    let age = (chrono::Utc::now().naive_utc() - queued)
        .num_seconds()
        .max(0);
    if age < 60 {
        format!("{age}s")
    } else if age < 60 * 60 {
        format!("{}m", age / 60)
    } else if age < 48 * 60 * 60 {
        format!("{}h", age / 3600)
    } else {
        format!("{}d", age / 86400)
    }
}

pub(crate) async fn queue(
    client: &ApiClient,
    profile: &Profile,
    args: QueueArgs,
    sink: &mut dyn Sink,
) -> CliResult<i32> {
    let mut data = json!({
        "url": args.url,
        "requestedPages": args.pages,
    });

    if let Some(callback) = args.callback {
        data["callback"] = json!(callback);
    }
    if let Some(callback_id) = args.callback_id {
        data["callbackId"] = json!(callback_id);
    }
    if let Some(config) = args.config {
        data["config"] = json!(config);
    } else if let Some(path) = args.config_file {
        data["config"] = json!(read_text(&path)?);
    }
    if let Some(lifetime) = args.lifetime {
        data["lifetime"] = json!(lifetime);
    }
    if let Some(metadata) = load_metadata(args.metadata.as_deref(), args.metadata_file.as_deref())? {
        data["metadata"] = metadata;
    }

    let response = client
        .send(Method::POST, None, "reports", &[], Some(&data))
        .await?;
    display_response(profile, &response, None, sink)
}

pub(crate) async fn update(
    client: &ApiClient,
    profile: &Profile,
    args: UpdateArgs,
    sink: &mut dyn Sink,
) -> CliResult<i32> {
    let UpdateArgs {
        metadata,
        metadata_file,
        report,
    } = args;
    let metadata = load_metadata(metadata.as_deref(), metadata_file.as_deref())?
        .ok_or_else(|| CliError::validation("metadata is required"))?;
    let data = json!({ "metadata": metadata });

    let response = client
        .send(Method::PUT, Some(REPORTS_BASE), &report, &[], Some(&data))
        .await?;
    display_response(profile, &response, None, sink)
}

pub(crate) async fn status(
    client: &ApiClient,
    profile: &Profile,
    args: &ReportArgs,
    sink: &mut dyn Sink,
) -> CliResult<i32> {
    let response = client
        .send(Method::GET, Some(REPORTS_BASE), &args.report, &[], None)
        .await?;
    display_response(profile, &response, None, sink)
}

pub(crate) async fn delete(
    client: &ApiClient,
    profile: &Profile,
    args: &ReportArgs,
    sink: &mut dyn Sink,
) -> CliResult<i32> {
    let response = client
        .send(Method::DELETE, Some(REPORTS_BASE), &args.report, &[], None)
        .await?;
    display_response(profile, &response, None, sink)
}

pub(crate) async fn fetch(
    client: &ApiClient,
    profile: &Profile,
    args: &ReportArgs,
    sink: &mut dyn Sink,
) -> CliResult<i32> {
    let response = client
        .send(Method::GET, Some(REPORTS_BASE), &args.report, &[], None)
        .await?;
    if response.status != StatusCode::OK {
        return display_response(profile, &response, None, sink);
    }
    if profile.debug {
        display_response(profile, &response, None, sink)?;
    }

    let detail = response
        .json()
        .ok()
        .and_then(|body| {
            body.get("detail")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .filter(|url| !url.is_empty());
    let Some(detail) = detail else {
        if !profile.quiet {
            sink.write_text("Report is not available yet\n")?;
        }
        return Ok(EX_IOERR);
    };

    let content = client.fetch_url(&detail).await?;
    display_response(profile, &content, None, sink)
}

fn load_metadata(inline: Option<&str>, file: Option<&Path>) -> CliResult<Option<Value>> {
    let text = match (inline, file) {
        (Some(inline), _) => inline.to_string(),
        (None, Some(path)) => read_text(path)?,
        (None, None) => return Ok(None),
    };
    serde_json::from_str(&text)
        .map(Some)
        .map_err(|err| CliError::validation(format!("metadata is not valid JSON: {err}")))
}

fn read_text(path: &Path) -> CliResult<String> {
    std::fs::read_to_string(path)
        .map_err(|err| CliError::failure(anyhow!("failed to read {}: {err}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dexter_render::StreamSink;
    use httpmock::prelude::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn client_for(server: &MockServer) -> ApiClient {
        let mut profile = Profile::for_tests();
        profile.root = format!("{}/", server.base_url()).parse().expect("valid URL");
        ApiClient::new(&profile).expect("client builds")
    }

    fn sink() -> StreamSink<Vec<u8>> {
        StreamSink::new(Vec::new())
    }

    fn text_of(sink: StreamSink<Vec<u8>>) -> String {
        String::from_utf8(sink.into_inner()).expect("utf-8")
    }

    fn recent_timestamp() -> String {
        (chrono::Utc::now() - chrono::Duration::seconds(30))
            .format("%Y-%m-%dT%H:%M:%S%.3fZ")
            .to_string()
    }

    #[tokio::test]
    async fn list_expands_incomplete_and_sends_the_user_filter() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/reports")
                .query_param("status", "queued")
                .query_param("status", "running")
                .query_param("status", "callback")
                .query_param("user", "alice");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(serde_json::json!({"reports": {}}));
        });

        let client = client_for(&server);
        let profile = Profile::for_tests();
        let mut out = sink();
        let args = ListArgs {
            user: Some("alice".to_string()),
            status: vec![StatusFilter::Incomplete],
        };
        let code = list(&client, &profile, args, &mut out)
            .await
            .expect("list succeeds");
        mock.assert();
        assert_eq!(code, 0);
        assert_eq!(text_of(out), "No results\n");
    }

    #[tokio::test]
    async fn list_sorts_running_reports_ahead_of_queued() {
        let server = MockServer::start_async().await;
        let queued_at = recent_timestamp();
        server.mock(|when, then| {
            when.method(GET).path("/reports");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(serde_json::json!({"reports": {
                    "a": {
                        "url": "https://site-a.example",
                        "priority": 1,
                        "status": "queued",
                        "pages": 0,
                        "requestedPages": 5,
                        "queued": queued_at,
                    },
                    "b": {
                        "url": "https://site-b.example",
                        "priority": 1,
                        "status": "running",
                        "pages": 1200,
                        "requestedPages": 2500,
                        "queued": queued_at,
                    },
                }}));
        });

        let client = client_for(&server);
        let profile = Profile::for_tests();
        let mut out = sink();
        let args = ListArgs {
            user: None,
            status: vec![StatusFilter::All],
        };
        list(&client, &profile, args, &mut out)
            .await
            .expect("list succeeds");
        let text = text_of(out);
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[2].contains("site-b"), "running first: {text}");
        assert!(lines[2].contains("1,200/2,500"), "grouped pages: {text}");
        assert!(lines[3].contains("site-a"), "queued second: {text}");
        assert!(lines[3].contains('5'), "queued shows requested pages: {text}");
        assert!(lines[3].contains("30s"), "age column: {text}");
    }

    #[tokio::test]
    async fn queue_posts_the_assembled_body() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/reports")
                .json_body(serde_json::json!({
                    "url": "https://example.com",
                    "requestedPages": 3,
                    "callback": "https://hook.example",
                    "lifetime": 7,
                    "metadata": {"team": "qa"},
                }));
            then.status(200)
                .header("content-type", "application/json")
                .json_body(serde_json::json!({"id": "r-1", "status": "queued"}));
        });

        let client = client_for(&server);
        let profile = Profile::for_tests();
        let mut out = sink();
        let args = QueueArgs {
            callback: Some("https://hook.example".to_string()),
            callback_id: None,
            config: None,
            config_file: None,
            lifetime: Some(7),
            metadata: Some(r#"{"team": "qa"}"#.to_string()),
            metadata_file: None,
            url: "https://example.com".to_string(),
            pages: 3,
        };
        let code = queue(&client, &profile, args, &mut out)
            .await
            .expect("queue succeeds");
        mock.assert();
        assert_eq!(code, 0);
        assert_eq!(text_of(out), "id: r-1\nstatus: queued\n");
    }

    #[tokio::test]
    async fn update_puts_metadata_from_a_file() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(PUT)
                .path("/reports/r-9")
                .json_body(serde_json::json!({"metadata": {"note": "redo"}}));
            then.status(204);
        });

        let mut metadata_file = tempfile::NamedTempFile::new().expect("tempfile");
        metadata_file
            .write_all(br#"{"note": "redo"}"#)
            .expect("write metadata");

        let client = client_for(&server);
        let profile = Profile::for_tests();
        let mut out = sink();
        let args = UpdateArgs {
            metadata: None,
            metadata_file: Some(metadata_file.path().to_path_buf()),
            report: "r-9".to_string(),
        };
        let code = update(&client, &profile, args, &mut out)
            .await
            .expect("update succeeds");
        mock.assert();
        assert_eq!(code, 0);
        assert_eq!(text_of(out), "204 No Content\n");
    }

    #[tokio::test]
    async fn status_accepts_an_absolute_report_url() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET).path("/elsewhere/reports/r-2");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(serde_json::json!({"status": "complete"}));
        });

        let client = client_for(&server);
        let profile = Profile::for_tests();
        let mut out = sink();
        let args = ReportArgs {
            report: format!("{}/elsewhere/reports/r-2", server.base_url()),
        };
        let code = status(&client, &profile, &args, &mut out)
            .await
            .expect("status succeeds");
        mock.assert();
        assert_eq!(code, 0);
        assert_eq!(text_of(out), "status: complete\n");
    }

    #[tokio::test]
    async fn delete_issues_a_delete_request() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(DELETE).path("/reports/r-3");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(serde_json::json!({"deleted": true}));
        });

        let client = client_for(&server);
        let profile = Profile::for_tests();
        let mut out = sink();
        let args = ReportArgs {
            report: "r-3".to_string(),
        };
        let code = delete(&client, &profile, &args, &mut out)
            .await
            .expect("delete succeeds");
        mock.assert();
        assert_eq!(code, 0);
    }

    #[tokio::test]
    async fn fetch_follows_the_detail_url() {
        let server = MockServer::start_async().await;
        let detail_url = server.url("/files/report-7.json");
        server.mock(|when, then| {
            when.method(GET).path("/reports/r-7");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(serde_json::json!({"detail": detail_url}));
        });
        let detail_mock = server.mock(|when, then| {
            when.method(GET).path("/files/report-7.json");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(serde_json::json!({"pages": 12345}));
        });

        let client = client_for(&server);
        let profile = Profile::for_tests();
        let mut out = sink();
        let args = ReportArgs {
            report: "r-7".to_string(),
        };
        let code = fetch(&client, &profile, &args, &mut out)
            .await
            .expect("fetch succeeds");
        detail_mock.assert();
        assert_eq!(code, 0);
        assert_eq!(text_of(out), "pages: 12,345\n");
    }

    #[tokio::test]
    async fn fetch_without_detail_reports_unavailable() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/reports/r-8");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(serde_json::json!({"status": "running"}));
        });

        let client = client_for(&server);
        let profile = Profile::for_tests();
        let mut out = sink();
        let args = ReportArgs {
            report: "r-8".to_string(),
        };
        let code = fetch(&client, &profile, &args, &mut out)
            .await
            .expect("fetch handles missing detail");
        assert_eq!(code, EX_IOERR);
        assert_eq!(text_of(out), "Report is not available yet\n");
    }

    #[tokio::test]
    async fn non_success_responses_exit_with_io_error() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/reports/missing");
            then.status(404)
                .header("content-type", "application/json")
                .json_body(serde_json::json!({"error": "no such report"}));
        });

        let client = client_for(&server);
        let profile = Profile::for_tests();
        let mut out = sink();
        let args = ReportArgs {
            report: "missing".to_string(),
        };
        let code = status(&client, &profile, &args, &mut out)
            .await
            .expect("status renders the error");
        assert_eq!(code, EX_IOERR);
        let text = text_of(out);
        assert!(text.starts_with("404 Not Found\n"), "got {text:?}");
        assert!(text.contains("error: no such report"), "got {text:?}");
    }

    #[test]
    fn ages_scale_from_seconds_to_days() {
        let now = chrono::Utc::now().naive_utc();
        assert_eq!(age_cell(now - chrono::Duration::seconds(42)), "42s");
        assert_eq!(age_cell(now - chrono::Duration::seconds(5 * 60)), "5m");
        assert_eq!(age_cell(now - chrono::Duration::hours(30)), "30h");
        assert_eq!(age_cell(now - chrono::Duration::days(12)), "12d");
    }

    #[test]
    fn dexter_dates_parse_with_and_without_fractions() {
        assert!(parse_date("2026-08-28T10:15:30.123Z").is_some());
        assert!(parse_date("2026-08-28T10:15:30Z").is_some());
        assert!(parse_date("not a date").is_none());
    }

    #[test]
    fn inline_metadata_must_be_valid_json() {
        let err = load_metadata(Some("{broken"), None).expect_err("invalid JSON");
        assert!(matches!(err, CliError::Validation(_)));
    }
}
