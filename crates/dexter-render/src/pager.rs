//! Pager resolution and wrapped-line estimation.

use std::env;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Environment variable consulted for a pager override.
pub const PAGER_ENV: &str = "PAGER";

/// Pager used when the environment does not name one.
pub const DEFAULT_PAGER: &str = "less";

/// Resolve the pager executable from the environment.
#[must_use]
pub fn resolve_pager() -> Option<PathBuf> {
    resolve_pager_from(env::var(PAGER_ENV).ok().as_deref())
}

/// Resolve a pager from an explicit override, falling back to
/// [`DEFAULT_PAGER`]. Overrides containing a path separator are checked
/// for executability directly; bare names go through a `PATH` lookup.
#[must_use]
pub fn resolve_pager_from(override_value: Option<&str>) -> Option<PathBuf> {
    let candidate = override_value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_PAGER);
    let path = Path::new(candidate);
    if path.components().count() > 1 {
        is_executable(path).then(|| path.to_path_buf())
    } else {
        which::which(candidate).ok()
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .is_ok_and(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Estimate how many terminal rows `text` occupies when wrapped at
/// `columns`: each newline-separated segment contributes
/// `1 + len / columns`.
#[must_use]
pub fn estimate_lines(text: &str, columns: usize) -> usize {
    let columns = columns.max(1);
    text.split('\n')
        .map(|line| 1 + line.chars().count() / columns)
        .sum()
}

/// Pipe `text` through the pager, inheriting the parent's stdout.
///
/// A write failure after the pager has started (for example the user
/// quitting early) is not an error: the content was already handed over.
///
/// # Errors
///
/// Returns an error only when the pager process cannot be spawned.
pub fn page_through(pager: &Path, text: &str) -> std::io::Result<()> {
    let mut child = Command::new(pager).stdin(Stdio::piped()).spawn()?;
    if let Some(mut stdin) = child.stdin.take()
        && let Err(err) = stdin.write_all(text.as_bytes())
    {
        tracing::debug!(error = %err, "pager closed its input early");
    }
    match child.wait() {
        Ok(status) if !status.success() => {
            tracing::debug!(pager = %pager.display(), ?status, "pager exited with failure");
        }
        Ok(_) => {}
        Err(err) => {
            tracing::debug!(error = %err, "failed to wait for pager");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn estimate_counts_wrapped_lines() {
        let long_line = "x".repeat(100);
        assert_eq!(estimate_lines(&long_line, 40), 3);
    }

    #[test]
    fn estimate_sums_over_all_segments() {
        let text = format!("short\n{}\n", "y".repeat(80));
        // "short" -> 1, 80 chars at 40 -> 3, trailing empty segment -> 1.
        assert_eq!(estimate_lines(&text, 40), 5);
    }

    #[test]
    fn estimate_tolerates_zero_columns() {
        assert_eq!(estimate_lines("abc", 0), 4);
    }

    #[cfg(unix)]
    #[test]
    fn explicit_pager_path_must_be_executable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().expect("tempdir");
        let script = dir.path().join("fake-pager");
        std::fs::write(&script, "#!/bin/sh\ncat\n").expect("write script");

        // Not yet executable: resolution must fail.
        assert_eq!(resolve_pager_from(script.to_str()), None);

        let mut perms = std::fs::metadata(&script).expect("metadata").permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&script, perms).expect("chmod");
        assert_eq!(resolve_pager_from(script.to_str()), Some(script));
    }

    #[test]
    fn missing_explicit_pager_resolves_to_none() {
        assert_eq!(
            resolve_pager_from(Some("/nonexistent/definitely-not-a-pager")),
            None
        );
    }
}
