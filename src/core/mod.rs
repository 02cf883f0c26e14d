//! Core infrastructure: shared foundation used across the whole crate.
//!
//! - **config**: configuration loading, the front-end environment record
//!   and resolved server types.
//! - **error**: application-wide error enum.

pub mod config;
pub mod error;
