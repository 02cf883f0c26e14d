//! Raw TOML deserialization types.
//!
//! These structs mirror the TOML file shape and use `serde` defaults.
//! The `load` module converts them into the public `types` structs.

use serde::Deserialize;

// ── Top-level ────────────────────────────────────────────────────────────────

/// Raw TOML shape, serde target before resolution.
#[derive(Deserialize)]
pub(super) struct RawConfig {
    pub environment: RawEnvironment,
    #[serde(default)]
    pub server: RawServer,
    #[serde(default)]
    pub database: RawDatabase,
    #[serde(default)]
    pub auth: RawAuth,
    #[serde(default)]
    pub logging: RawLogging,
}

// ── Environment ─────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub(super) struct RawEnvironment {
    #[serde(default)]
    pub production: bool,
    pub api_server_url: String,
    pub auth0: RawAuth0,
}

#[derive(Deserialize)]
pub(super) struct RawAuth0 {
    pub url: String,
    pub audience: String,
    pub client_id: String,
    pub callback_url: String,
}

// ── Server ──────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub(super) struct RawServer {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default)]
    pub cors_allow_origin: Option<String>,
}

impl Default for RawServer {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            cors_allow_origin: None,
        }
    }
}

#[derive(Deserialize)]
pub(super) struct RawDatabase {
    #[serde(default = "default_database_path")]
    pub path: String,
    #[serde(default)]
    pub reset_on_start: bool,
}

impl Default for RawDatabase {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            reset_on_start: false,
        }
    }
}

#[derive(Deserialize)]
pub(super) struct RawAuth {
    #[serde(default = "default_jwks_cache_seconds")]
    pub jwks_cache_seconds: u64,
    #[serde(default = "default_jwks_min_refresh_seconds")]
    pub jwks_min_refresh_seconds: u64,
    #[serde(default = "default_leeway_seconds")]
    pub leeway_seconds: u64,
}

impl Default for RawAuth {
    fn default() -> Self {
        Self {
            jwks_cache_seconds: default_jwks_cache_seconds(),
            jwks_min_refresh_seconds: default_jwks_min_refresh_seconds(),
            leeway_seconds: default_leeway_seconds(),
        }
    }
}

#[derive(Deserialize)]
pub(super) struct RawLogging {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for RawLogging {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ── Defaults ────────────────────────────────────────────────────────────────

pub(super) fn default_bind() -> String {
    "127.0.0.1:5000".to_string()
}

/// `":memory:"` keeps the store in-process only.
pub(super) fn default_database_path() -> String {
    "~/.coffeeshop/database.db".to_string()
}

pub(super) fn default_jwks_cache_seconds() -> u64 {
    3600
}

pub(super) fn default_jwks_min_refresh_seconds() -> u64 {
    30
}

pub(super) fn default_leeway_seconds() -> u64 {
    60
}

pub(super) fn default_log_level() -> String {
    "info".to_string()
}
