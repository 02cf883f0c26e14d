//! Public configuration types.
//!
//! These are the resolved, ready-to-use structs the server consumes.
//! Raw TOML deserialization types live in `raw.rs`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::AppError;

// ── Front-end environment ───────────────────────────────────────────────────

/// Identity-provider settings shared between the front-end and the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Auth0Config {
    /// Tenant domain, or a bare prefix such as `"robenkr.us"`.
    pub url: String,
    /// Token audience the API expects.
    pub audience: String,
    /// Client id registered for the front-end application.
    #[serde(rename = "clientId")]
    pub client_id: String,
    /// Where the identity provider redirects after login.
    #[serde(rename = "callbackURL")]
    pub callback_url: String,
}

impl Auth0Config {
    /// Fully-qualified tenant host.
    ///
    /// A value that already contains `.auth0.com`, or any explicit host
    /// with a port, is used as-is; otherwise `.auth0.com` is appended.
    pub fn domain(&self) -> String {
        let host = self
            .url
            .trim()
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_end_matches('/');
        if host.ends_with(".auth0.com") || host.contains(':') {
            host.to_string()
        } else {
            format!("{host}.auth0.com")
        }
    }

    /// Expected `iss` claim.
    pub fn issuer(&self) -> String {
        format!("https://{}/", self.domain())
    }

    pub fn jwks_url(&self) -> String {
        format!("https://{}/.well-known/jwks.json", self.domain())
    }
}

/// Runtime constants handed to the web front-end.
///
/// Loaded once at startup and never mutated afterwards. Serializes to the
/// exact shape the front-end build expects (`apiServerUrl`, `auth0.clientId`,
/// `auth0.callbackURL`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    pub production: bool,
    #[serde(rename = "apiServerUrl")]
    pub api_server_url: String,
    pub auth0: Auth0Config,
}

impl Environment {
    /// Reject empty strings and unparsable URLs.
    pub fn validate(&self) -> Result<(), AppError> {
        let fields = [
            ("apiServerUrl", &self.api_server_url),
            ("auth0.url", &self.auth0.url),
            ("auth0.audience", &self.auth0.audience),
            ("auth0.clientId", &self.auth0.client_id),
            ("auth0.callbackURL", &self.auth0.callback_url),
        ];
        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(AppError::Config(format!("environment field `{name}` must not be empty")));
            }
        }
        for (name, value) in [
            ("apiServerUrl", &self.api_server_url),
            ("auth0.callbackURL", &self.auth0.callback_url),
        ] {
            url::Url::parse(value).map_err(|e| {
                AppError::Config(format!("environment field `{name}` is not a valid URL ({value}): {e}"))
            })?;
        }
        Ok(())
    }

    pub fn to_frontend_json(&self) -> serde_json::Value {
        json!({
            "production": self.production,
            "apiServerUrl": self.api_server_url,
            "auth0": {
                "url": self.auth0.url,
                "audience": self.auth0.audience,
                "clientId": self.auth0.client_id,
                "callbackURL": self.auth0.callback_url,
            }
        })
    }
}

// ── Server side ─────────────────────────────────────────────────────────────

/// HTTP listener configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address to bind the API listener to.
    pub bind: String,
    /// `None` allows any origin.
    pub cors_allow_origin: Option<String>,
}

/// SQLite drink store configuration.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Database file (already expanded, no `~`). `None` means in-memory.
    pub path: Option<PathBuf>,
    /// Drop and reseed the drinks table at startup.
    pub reset_on_start: bool,
}

/// Bearer-token verification tuning.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// How long a fetched JWKS stays cached.
    pub jwks_cache_seconds: u64,
    /// Minimum gap between two JWKS fetches, whatever triggered them.
    pub jwks_min_refresh_seconds: u64,
    /// Allowed clock skew on `exp`.
    pub leeway_seconds: u64,
}

/// Fully-resolved application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    pub log_level: String,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
}
