//! Configuration loading with env-var overrides.
//!
//! Reads TOML files, supports `[meta] base = "..."` inheritance chains,
//! and applies `COFFEESHOP_*` env overrides.

use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::AppError;

use super::raw::{self, RawConfig};
use super::types::*;

/// Values that take precedence over whatever the TOML chain resolves to.
///
/// [`load`] fills this from `COFFEESHOP_*` env vars; tests build it directly
/// instead of mutating the process environment.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub log_level: Option<String>,
    pub bind: Option<String>,
    pub database: Option<String>,
    pub api_server_url: Option<String>,
    pub auth0_domain: Option<String>,
    pub auth0_audience: Option<String>,
    pub auth0_client_id: Option<String>,
    pub auth0_callback_url: Option<String>,
}

impl Overrides {
    pub fn from_env() -> Self {
        Self {
            log_level: env::var("COFFEESHOP_LOG_LEVEL").ok(),
            bind: env::var("COFFEESHOP_BIND").ok(),
            database: env::var("COFFEESHOP_DATABASE").ok(),
            api_server_url: env::var("COFFEESHOP_API_SERVER_URL").ok(),
            auth0_domain: env::var("COFFEESHOP_AUTH0_DOMAIN").ok(),
            auth0_audience: env::var("COFFEESHOP_AUTH0_AUDIENCE").ok(),
            auth0_client_id: env::var("COFFEESHOP_AUTH0_CLIENT_ID").ok(),
            auth0_callback_url: env::var("COFFEESHOP_AUTH0_CALLBACK_URL").ok(),
        }
    }
}

/// Deep-merge two TOML values.
/// Tables are merged recursively; the overlay only needs to specify keys that
/// differ from the base. For every other type the overlay value replaces the
/// base value wholesale.
fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_tbl), toml::Value::Table(overlay_tbl)) => {
            for (key, ov_val) in overlay_tbl {
                let merged = match base_tbl.remove(&key) {
                    Some(base_val) => merge_toml(base_val, ov_val),
                    None => ov_val,
                };
                base_tbl.insert(key, merged);
            }
            toml::Value::Table(base_tbl)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file, follow any `[meta] base = "..."` chain, and return the
/// fully merged `toml::Value`. `visited` carries canonicalized paths already
/// seen in this chain so circular references are caught early.
fn load_raw_merged(path: &Path, visited: &mut HashSet<PathBuf>) -> Result<toml::Value, AppError> {
    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    if !visited.insert(canonical) {
        return Err(AppError::Config(format!(
            "circular base reference detected at: {}",
            path.display()
        )));
    }

    let text = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;

    let overlay_val: toml::Value = toml::from_str(&text)
        .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))?;

    if let Some(base_str) = overlay_val
        .get("meta")
        .and_then(|m| m.get("base"))
        .and_then(|b| b.as_str())
    {
        let base_path = if Path::new(base_str).is_absolute() {
            PathBuf::from(base_str)
        } else {
            path.parent().unwrap_or(Path::new(".")).join(base_str)
        };
        let base_val = load_raw_merged(&base_path, visited)?;
        Ok(merge_toml(base_val, overlay_val))
    } else {
        Ok(overlay_val)
    }
}

/// Load config from the given path, or `config/default.toml`, then apply env-var overrides.
/// If no path is given and `config/default.toml` does not exist, returns the
/// built-in development default.
pub fn load(config_path: Option<&str>) -> Result<Config, AppError> {
    let overrides = Overrides::from_env();

    if let Some(path) = config_path {
        return load_from(Path::new(path), &overrides);
    }

    let default_path = Path::new("config/default.toml");
    if default_path.exists() {
        load_from(default_path, &overrides)
    } else {
        let config = apply_overrides(builtin_default(), &overrides);
        config.environment.validate()?;
        Ok(config)
    }
}

/// Internal loader: accepts an explicit path and overrides.
/// Follows `[meta] base = "..."` inheritance chains before resolving.
pub fn load_from(path: &Path, overrides: &Overrides) -> Result<Config, AppError> {
    let merged_val = load_raw_merged(path, &mut HashSet::new())?;

    let parsed: RawConfig = Deserialize::deserialize(merged_val).map_err(|e: toml::de::Error| {
        AppError::Config(format!("config error in {}: {e}", path.display()))
    })?;

    let config = apply_overrides(resolve(parsed), overrides);
    config.environment.validate()?;
    Ok(config)
}

fn resolve(parsed: RawConfig) -> Config {
    let env = parsed.environment;
    Config {
        environment: Environment {
            production: env.production,
            api_server_url: env.api_server_url,
            auth0: Auth0Config {
                url: env.auth0.url,
                audience: env.auth0.audience,
                client_id: env.auth0.client_id,
                callback_url: env.auth0.callback_url,
            },
        },
        log_level: parsed.logging.level,
        server: ServerConfig {
            bind: parsed.server.bind,
            cors_allow_origin: parsed.server.cors_allow_origin.filter(|o| o != "*"),
        },
        database: DatabaseConfig {
            path: database_path(&parsed.database.path),
            reset_on_start: parsed.database.reset_on_start,
        },
        auth: AuthConfig {
            jwks_cache_seconds: parsed.auth.jwks_cache_seconds,
            jwks_min_refresh_seconds: parsed.auth.jwks_min_refresh_seconds,
            leeway_seconds: parsed.auth.leeway_seconds,
        },
    }
}

fn apply_overrides(mut config: Config, o: &Overrides) -> Config {
    if let Some(v) = &o.log_level {
        config.log_level = v.clone();
    }
    if let Some(v) = &o.bind {
        config.server.bind = v.clone();
    }
    if let Some(v) = &o.database {
        config.database.path = database_path(v);
    }
    if let Some(v) = &o.api_server_url {
        config.environment.api_server_url = v.clone();
    }
    let auth0 = &mut config.environment.auth0;
    if let Some(v) = &o.auth0_domain {
        auth0.url = v.clone();
    }
    if let Some(v) = &o.auth0_audience {
        auth0.audience = v.clone();
    }
    if let Some(v) = &o.auth0_client_id {
        auth0.client_id = v.clone();
    }
    if let Some(v) = &o.auth0_callback_url {
        auth0.callback_url = v.clone();
    }
    config
}

/// Development defaults used when no config file is present.
fn builtin_default() -> Config {
    Config {
        environment: Environment {
            production: false,
            api_server_url: "http://127.0.0.1:5000".to_string(),
            auth0: Auth0Config {
                url: "coffeeshop.us".to_string(),
                audience: "coffeeshop".to_string(),
                client_id: "coffeeshop-dev-client".to_string(),
                callback_url: "http://localhost:4200".to_string(),
            },
        },
        log_level: raw::default_log_level(),
        server: ServerConfig {
            bind: raw::default_bind(),
            cors_allow_origin: None,
        },
        database: DatabaseConfig {
            path: database_path(&raw::default_database_path()),
            reset_on_start: false,
        },
        auth: AuthConfig {
            jwks_cache_seconds: raw::default_jwks_cache_seconds(),
            jwks_min_refresh_seconds: raw::default_jwks_min_refresh_seconds(),
            leeway_seconds: raw::default_leeway_seconds(),
        },
    }
}

fn database_path(path: &str) -> Option<PathBuf> {
    if path == ":memory:" {
        None
    } else {
        Some(expand_home(path))
    }
}

/// Expand a leading `~` to the user's home directory.
/// Absolute or relative paths without `~` are returned unchanged.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}
