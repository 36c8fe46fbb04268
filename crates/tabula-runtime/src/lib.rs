#![forbid(unsafe_code)]

//! Reactive table store for tabula.
//!
//! This crate provides:
//! - [`TableStore`], the observable table state and its derivations
//!   (headings, synthesized records, sorted and decorated rows, footer)
//! - [`Notifier`], [`Subscription`] and [`BatchScope`], the payload-free
//!   pub/sub layer the store publishes through
//! - [`TableConfig`] and [`TableSettings`] for initialization and
//!   serializable settings
//!
//! # Feature Flags
//!
//! - `tracing`: debug spans around `get_rows` and `get_records`.
//! - `serde`: `Serialize`/`Deserialize` for [`TableSettings`],
//!   [`SortDirection`] and [`ColGroup`].

pub mod error;
pub mod reactive;
pub mod store;

pub use error::TableError;
pub use reactive::{BatchScope, Notifier, Subscription};
pub use store::{
    ColGroup, DEFAULT_TABLE_ID, FooterFn, RowValue, SortDirection, TableConfig, TableSettings,
    TableStore,
};
