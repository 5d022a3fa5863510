//! Command handlers.

pub(crate) mod reports;
