#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Adaptive output rendering for the Dexter CLI.
//!
//! Layout:
//! - `value.rs`: verbose tree renderer for arbitrary JSON values
//! - `table.rs`: column-aligned table layout with width fitting
//! - `sink.rs`: output sinks (direct stream or paged buffer)
//! - `pager.rs`: pager resolution and wrapped-line estimation
//! - `error.rs`: rendering error type

pub mod error;
pub mod pager;
pub mod sink;
pub mod table;
pub mod value;

pub use error::RenderError;
pub use sink::{PagedSink, Sink, StreamSink};
pub use table::{Table, render_table};
pub use value::{format_number, render_verbose};
