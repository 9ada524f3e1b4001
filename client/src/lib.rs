//! Client keeping a responsive local view of a worker's attendance in sync
//! with the attendance server.
//!
//! Actions are applied to the local view optimistically, rolled back to the
//! last server snapshot on failure, and always reconciled with the server on
//! success.
#![deny(
    nonstandard_style,
    rust_2018_idioms,
    rustdoc::all,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code
)]
#![forbid(non_ascii_idents)]
#![warn(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    clippy::pedantic,
    clippy::wildcard_enum_match_arm,
    deprecated_in_future,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    unused_crate_dependencies,
    unused_import_braces,
    unused_labels,
    unused_lifetimes,
    unused_qualifications,
    unused_results
)]

pub mod backend;
pub mod cache;
pub mod config;
pub mod gate;
pub mod hq;
pub mod sync;

#[cfg(test)]
use serde_json as _;

pub use self::{
    backend::Backend,
    cache::Cache,
    config::Config,
    gate::Gate,
    hq::Hq,
    sync::{Intent, Outcome, Synchronizer, View},
};
