//! Profile configuration: rcfile loading and command-line overlay.
//!
//! The rcfile is a TOML document of profile tables
//! (`[default]`, `[staging]`, ...). Flags override rcfile values; `api-key`
//! and `root` must be present after the merge.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use anyhow::anyhow;
use serde::Deserialize;
use url::Url;

use crate::cli::Cli;
use crate::client::{CliError, CliResult};

/// Width used when the terminal size cannot be probed.
const FALLBACK_WIDTH: usize = 79;

/// Collection keys unwrapped from single-key bodies before verbose
/// rendering.
const DEFAULT_UNWRAP_KEYS: &[&str] = &["reports"];

/// One profile table as it appears in the rcfile.
#[derive(Debug, Default, Deserialize)]
struct RawProfile {
    #[serde(rename = "api-key")]
    api_key: Option<String>,
    root: Option<String>,
    width: Option<usize>,
    debug: Option<bool>,
    quiet: Option<bool>,
    verbose: Option<bool>,
    json: Option<bool>,
    #[serde(rename = "unwrap-keys")]
    unwrap_keys: Option<Vec<String>>,
}

/// Resolved configuration for one invocation.
#[derive(Debug, Clone)]
pub(crate) struct Profile {
    pub(crate) api_key: String,
    pub(crate) root: Url,
    pub(crate) width: usize,
    pub(crate) debug: bool,
    pub(crate) quiet: bool,
    pub(crate) verbose: bool,
    pub(crate) json: bool,
    pub(crate) unwrap_keys: Vec<String>,
}

impl Profile {
    /// Load the named rcfile profile and overlay command-line flags.
    pub(crate) fn resolve(cli: &Cli) -> CliResult<Self> {
        let raw = load_rcfile(&cli.rcfile, &cli.profile)?;

        let api_key = cli
            .api_key
            .clone()
            .or(raw.api_key)
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                CliError::validation("api-key not specified (use --api-key or add it to the profile)")
            })?;

        let root = cli.root.clone().or(raw.root).ok_or_else(|| {
            CliError::validation("root not specified (use --root or add it to the profile)")
        })?;
        let root = parse_root(&root)?;

        let width = cli
            .width
            .or(raw.width)
            .unwrap_or_else(default_width)
            .max(1);

        Ok(Self {
            api_key,
            root,
            width,
            debug: cli.debug || raw.debug.unwrap_or(false),
            quiet: cli.quiet || raw.quiet.unwrap_or(false),
            verbose: cli.verbose || raw.verbose.unwrap_or(false),
            json: cli.json || raw.json.unwrap_or(false),
            unwrap_keys: raw.unwrap_keys.unwrap_or_else(|| {
                DEFAULT_UNWRAP_KEYS.iter().map(ToString::to_string).collect()
            }),
        })
    }
}

/// Normalize the API root: must parse as a URL and end with a slash so
/// relative joins land under it.
fn parse_root(input: &str) -> CliResult<Url> {
    let mut normalized = input.trim_end_matches('/').to_string();
    normalized.push('/');
    normalized
        .parse()
        .map_err(|err| CliError::validation(format!("invalid root URL '{input}': {err}")))
}

fn load_rcfile(path: &str, profile: &str) -> CliResult<RawProfile> {
    let path = expand_home(path);
    let Ok(contents) = fs::read_to_string(&path) else {
        // A missing rcfile is fine: flags may carry the whole profile.
        return Ok(RawProfile::default());
    };
    let mut tables: HashMap<String, RawProfile> = toml::from_str(&contents).map_err(|err| {
        CliError::failure(anyhow!("failed to parse {}: {err}", path.display()))
    })?;
    Ok(tables.remove(profile).unwrap_or_default())
}

fn expand_home(path: &str) -> PathBuf {
    path.strip_prefix("~/")
        .and_then(|rest| dirs::home_dir().map(|home| home.join(rest)))
        .unwrap_or_else(|| PathBuf::from(path))
}

fn default_width() -> usize {
    terminal_size::terminal_size().map_or(FALLBACK_WIDTH, |(width, _)| {
        usize::from(width.0).saturating_sub(1)
    })
}

#[cfg(test)]
impl Profile {
    /// Minimal profile for renderer and dispatcher tests.
    pub(crate) fn for_tests() -> Self {
        Self {
            api_key: "test-key".to_string(),
            root: "https://dexter.test/api/".parse().expect("valid URL"),
            width: 79,
            debug: false,
            quiet: false,
            verbose: false,
            json: false,
            unwrap_keys: vec!["reports".to_string()],
        }
    }
}
