//! Error types for rendering operations.

use std::io;

use thiserror::Error;

/// Primary error type for rendering operations.
#[derive(Debug, Error)]
pub enum RenderError {
    /// A data row did not match the header's cell count.
    #[error("malformed table: row {row} has {found} cells, expected {expected}")]
    MalformedTable {
        /// Index of the offending data row (0 = first data row).
        row: usize,
        /// Cell count declared by the header.
        expected: usize,
        /// Cell count found in the row.
        found: usize,
    },
    /// The output sink failed.
    #[error("failed to write rendered output")]
    Io(#[from] io::Error),
}
