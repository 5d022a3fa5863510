//! Shared HTTP client and error types for the CLI.

use std::io;
use std::time::Duration;

use anyhow::anyhow;
use reqwest::{Client, Method, StatusCode, header};
use url::Url;
use serde_json::Value;

use crate::config::Profile;

/// Basic-auth user name expected by the Dexter API.
pub(crate) const API_USER: &str = "dexter";
/// Fixed request timeout owned by the network layer.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Successful exit.
pub(crate) const EX_OK: i32 = 0;
/// Usage error (bad flags, unusable profile).
pub(crate) const EX_USAGE: i32 = 2;
/// Operational failure, including non-2xx API responses.
pub(crate) const EX_IOERR: i32 = 74;

/// CLI-level error type to distinguish validation from operational failures.
#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Failure(anyhow::Error),
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => EX_USAGE,
            Self::Failure(_) => EX_IOERR,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}

impl From<io::Error> for CliError {
    fn from(err: io::Error) -> Self {
        Self::Failure(err.into())
    }
}

impl From<dexter_render::RenderError> for CliError {
    fn from(err: dexter_render::RenderError) -> Self {
        Self::Failure(err.into())
    }
}

/// HTTP client bound to one profile's root URL and API key.
#[derive(Debug, Clone)]
pub(crate) struct ApiClient {
    client: Client,
    root: Url,
    api_key: String,
}

impl ApiClient {
    pub(crate) fn new(profile: &Profile) -> CliResult<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| CliError::failure(anyhow!("failed to build HTTP client: {err}")))?;
        Ok(Self {
            client,
            root: profile.root.clone(),
            api_key: profile.api_key.clone(),
        })
    }

    /// Issue one authenticated API request.
    ///
    /// `target` resolves against `base` (when given) and the profile root
    /// with RFC 3986 join semantics, so an absolute URL names the resource
    /// directly while a bare ID lands under `base`.
    pub(crate) async fn send(
        &self,
        method: Method,
        base: Option<&str>,
        target: &str,
        query: &[(String, String)],
        body: Option<&Value>,
    ) -> CliResult<ApiResponse> {
        let url = self.resolve(base, target)?;
        tracing::debug!(%method, %url, ?query, "dispatching API request");
        if let Some(body) = body {
            tracing::debug!(
                body = %serde_json::to_string_pretty(body).unwrap_or_default(),
                "request body"
            );
        }

        let mut request = self
            .client
            .request(method, url.clone())
            .basic_auth(API_USER, Some(&self.api_key));
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|err| CliError::failure(anyhow!("request to {url} failed: {err}")))?;
        ApiResponse::read(response).await
    }

    /// Unauthenticated GET of an absolute URL (report detail downloads).
    pub(crate) async fn fetch_url(&self, url: &str) -> CliResult<ApiResponse> {
        tracing::debug!(%url, "fetching report content");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| CliError::failure(anyhow!("request to {url} failed: {err}")))?;
        ApiResponse::read(response).await
    }

    fn resolve(&self, base: Option<&str>, target: &str) -> CliResult<Url> {
        let joined = match base {
            Some(base) => self.root.join(base).and_then(|url| url.join(target)),
            None => self.root.join(target),
        };
        joined.map_err(|err| CliError::failure(anyhow!("invalid request URL '{target}': {err}")))
    }
}

/// Decoded API response handed to the output dispatcher.
#[derive(Debug, Clone)]
pub(crate) struct ApiResponse {
    pub(crate) status: StatusCode,
    pub(crate) location: Option<String>,
    pub(crate) body: Vec<u8>,
}

impl ApiResponse {
    async fn read(response: reqwest::Response) -> CliResult<Self> {
        let status = response.status();
        let location = response
            .headers()
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response
            .bytes()
            .await
            .map_err(|err| CliError::failure(anyhow!("failed to read response body: {err}")))?
            .to_vec();
        Ok(Self {
            status,
            location,
            body,
        })
    }

    /// Canonical reason phrase for the status line.
    pub(crate) fn reason(&self) -> &'static str {
        self.status.canonical_reason().unwrap_or("Unknown")
    }

    /// Parse the body as JSON.
    pub(crate) fn json(&self) -> CliResult<Value> {
        serde_json::from_slice(&self.body)
            .map_err(|err| CliError::failure(anyhow!("response body is not valid JSON: {err}")))
    }
}
