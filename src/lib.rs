//! Coffee shop backend.
//!
//! - **config**: the front-end [`Environment`](config::Environment) record
//!   plus server settings, loaded from layered TOML.
//! - **store**: SQLite drink menu.
//! - **auth**: bearer-token verification and permission checks.
//! - **api**: axum router and server loop.

pub mod api;
pub mod auth;
pub mod bootstrap;
pub mod core;
pub mod store;

pub use crate::bootstrap::logger;
pub use crate::core::{config, error};
