#![forbid(unsafe_code)]

//! Errors surfaced by tabula-runtime.
//!
//! The store itself never fails: misconfiguration degrades to a no-op sort
//! and caller-supplied functions propagate their own panics. The only
//! fallible surface is parsing configuration text.

/// Errors from table configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TableError {
    /// A sort direction string was not recognized.
    #[error("invalid sort direction {0:?} (expected \"asc\", \"desc\" or \"na\")")]
    InvalidSortDirection(String),
}
