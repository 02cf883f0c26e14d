//! Configuration loading with env-var overrides.
//!
//! Reads `config/default.toml` relative to the current working directory,
//! then applies `COFFEESHOP_*` env overrides.
//!
//! # Module layout
//!
//! - **types**: Public configuration structs: the front-end [`Environment`]
//!   record plus the server-side `ServerConfig`, `DatabaseConfig`, `AuthConfig`.
//! - **raw**: Raw TOML deserialization types. These mirror the file shape
//!   and use serde defaults; kept private.
//! - **load**: Loading logic: `merge_toml`, `load_raw_merged`, `load`,
//!   `load_from`, `expand_home`.

mod load;
mod raw;
mod types;

pub use load::{expand_home, load, load_from, Overrides};
pub use types::*;

impl Config {
    /// In-memory store, fixed tenant, no file access. Used by tests and by
    /// integration harnesses that build the router directly.
    pub fn test_default() -> Self {
        Self {
            environment: Environment {
                production: false,
                api_server_url: "http://127.0.0.1:5000".into(),
                auth0: Auth0Config {
                    url: "coffeeshop-test.us".into(),
                    audience: "coffeeshop".into(),
                    client_id: "test-client-id".into(),
                    callback_url: "http://localhost:4200".into(),
                },
            },
            log_level: "info".into(),
            server: ServerConfig {
                bind: raw::default_bind(),
                cors_allow_origin: None,
            },
            database: DatabaseConfig {
                path: None,
                reset_on_start: true,
            },
            auth: AuthConfig {
                jwks_cache_seconds: 60,
                jwks_min_refresh_seconds: 30,
                leeway_seconds: 0,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::{Path, PathBuf};
    use tempfile::{NamedTempFile, TempDir};

    const MINIMAL_TOML: &str = r#"
[environment]
production = false
api_server_url = "http://127.0.0.1:5000"

[environment.auth0]
url = "robenkr.us"
audience = "coffeeshop"
client_id = "bIKKotQ5ebMBolbYhQ5HjFxDFi2K3tjz"
callback_url = "http://localhost:4200"
"#;

    fn write_toml(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    fn write_named(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let p = dir.path().join(name);
        std::fs::write(&p, content).unwrap();
        p
    }

    #[test]
    fn parse_basic_config() {
        let f = write_toml(MINIMAL_TOML);
        let cfg = load_from(f.path(), &Overrides::default()).unwrap();
        assert!(!cfg.environment.production);
        assert_eq!(cfg.environment.api_server_url, "http://127.0.0.1:5000");
        assert_eq!(cfg.environment.auth0.audience, "coffeeshop");
        assert_eq!(cfg.log_level, "info");
        assert_eq!(cfg.server.bind, "127.0.0.1:5000");
        assert!(!cfg.database.reset_on_start);
    }

    #[test]
    fn frontend_json_uses_camel_case_names() {
        let f = write_toml(MINIMAL_TOML);
        let cfg = load_from(f.path(), &Overrides::default()).unwrap();
        let v = cfg.environment.to_frontend_json();

        let top: Vec<&str> = v.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(top.len(), 3);
        assert!(top.contains(&"production"));
        assert!(top.contains(&"apiServerUrl"));
        assert!(top.contains(&"auth0"));

        let auth0 = v["auth0"].as_object().unwrap();
        assert_eq!(auth0.len(), 4);
        assert_eq!(auth0["url"], "robenkr.us");
        assert_eq!(auth0["audience"], "coffeeshop");
        assert_eq!(auth0["clientId"], "bIKKotQ5ebMBolbYhQ5HjFxDFi2K3tjz");
        assert_eq!(auth0["callbackURL"], "http://localhost:4200");
    }

    #[test]
    fn serde_shape_matches_frontend_json() {
        let env = Config::test_default().environment;
        let via_serde = serde_json::to_value(&env).unwrap();
        assert_eq!(via_serde, env.to_frontend_json());
        let back: Environment = serde_json::from_value(via_serde).unwrap();
        assert_eq!(back, env);
    }

    #[test]
    fn empty_field_is_rejected() {
        let toml = MINIMAL_TOML.replace(r#"audience = "coffeeshop""#, r#"audience = """#);
        let f = write_toml(&toml);
        let msg = load_from(f.path(), &Overrides::default()).unwrap_err().to_string();
        assert!(msg.contains("auth0.audience"), "{msg}");
    }

    #[test]
    fn malformed_url_is_rejected() {
        let toml = MINIMAL_TOML.replace("http://127.0.0.1:5000", "not a url");
        let f = write_toml(&toml);
        let msg = load_from(f.path(), &Overrides::default()).unwrap_err().to_string();
        assert!(msg.contains("apiServerUrl"), "{msg}");
    }

    #[test]
    fn missing_auth0_table_errors() {
        let toml = r#"
[environment]
api_server_url = "http://127.0.0.1:5000"
"#;
        let f = write_toml(toml);
        let msg = load_from(f.path(), &Overrides::default()).unwrap_err().to_string();
        assert!(msg.contains("config error"));
    }

    #[test]
    fn auth0_prefix_expands_to_tenant_domain() {
        let auth0 = Auth0Config {
            url: "robenkr.us".into(),
            audience: "coffeeshop".into(),
            client_id: "x".into(),
            callback_url: "http://localhost:4200".into(),
        };
        assert_eq!(auth0.domain(), "robenkr.us.auth0.com");
        assert_eq!(auth0.issuer(), "https://robenkr.us.auth0.com/");
        assert_eq!(auth0.jwks_url(), "https://robenkr.us.auth0.com/.well-known/jwks.json");
    }

    #[test]
    fn auth0_full_domain_is_kept() {
        let auth0 = Auth0Config {
            url: "https://tenant.eu.auth0.com/".into(),
            audience: "a".into(),
            client_id: "c".into(),
            callback_url: "http://localhost".into(),
        };
        assert_eq!(auth0.domain(), "tenant.eu.auth0.com");
    }

    #[test]
    fn auth0_domain_rule_only_exempts_auth0_hosts_and_ports() {
        let with_url = |url: &str| Auth0Config {
            url: url.into(),
            audience: "a".into(),
            client_id: "c".into(),
            callback_url: "http://localhost".into(),
        };
        assert_eq!(with_url("login.example.com").domain(), "login.example.com.auth0.com");
        assert_eq!(with_url("127.0.0.1:8443").domain(), "127.0.0.1:8443");
        assert_eq!(
            with_url("127.0.0.1:8443").jwks_url(),
            "https://127.0.0.1:8443/.well-known/jwks.json"
        );
    }

    #[test]
    fn overrides_win_over_file() {
        let f = write_toml(MINIMAL_TOML);
        let overrides = Overrides {
            log_level: Some("debug".into()),
            bind: Some("0.0.0.0:8080".into()),
            database: Some(":memory:".into()),
            api_server_url: Some("https://api.example.com".into()),
            auth0_client_id: Some("prod-client".into()),
            ..Overrides::default()
        };
        let cfg = load_from(f.path(), &overrides).unwrap();
        assert_eq!(cfg.log_level, "debug");
        assert_eq!(cfg.server.bind, "0.0.0.0:8080");
        assert!(cfg.database.path.is_none());
        assert_eq!(cfg.environment.api_server_url, "https://api.example.com");
        assert_eq!(cfg.environment.auth0.client_id, "prod-client");
        assert_eq!(cfg.environment.auth0.audience, "coffeeshop");
    }

    #[test]
    fn wildcard_cors_means_any_origin() {
        let toml = format!("{MINIMAL_TOML}\n[server]\ncors_allow_origin = \"*\"\n");
        let f = write_toml(&toml);
        let cfg = load_from(f.path(), &Overrides::default()).unwrap();
        assert!(cfg.server.cors_allow_origin.is_none());
    }

    #[test]
    fn tilde_expands_to_home() {
        let home = dirs::home_dir().expect("home dir must exist in test env");
        let expanded = expand_home("~/.coffeeshop");
        assert!(expanded.starts_with(&home));
        assert!(expanded.ends_with(".coffeeshop"));
    }

    #[test]
    fn absolute_path_unchanged() {
        assert_eq!(expand_home("/absolute/path"), PathBuf::from("/absolute/path"));
    }

    #[test]
    fn missing_file_errors() {
        let result = load_from(Path::new("/nonexistent/config.toml"), &Overrides::default());
        let msg = result.unwrap_err().to_string();
        assert!(msg.contains("config error"));
    }

    #[test]
    fn production_overlay_keeps_base_fields() {
        let dir = TempDir::new().unwrap();
        write_named(&dir, "default.toml", MINIMAL_TOML);
        let overlay = r#"
[meta]
base = "default.toml"

[environment]
production = true
api_server_url = "https://api.coffeeshop.example"

[environment.auth0]
callback_url = "https://coffeeshop.example"
"#;
        let p = write_named(&dir, "production.toml", overlay);
        let cfg = load_from(&p, &Overrides::default()).unwrap();
        assert!(cfg.environment.production);
        assert_eq!(cfg.environment.api_server_url, "https://api.coffeeshop.example");
        assert_eq!(cfg.environment.auth0.callback_url, "https://coffeeshop.example");
        assert_eq!(cfg.environment.auth0.url, "robenkr.us");
        assert_eq!(cfg.environment.auth0.client_id, "bIKKotQ5ebMBolbYhQ5HjFxDFi2K3tjz");
    }

    #[test]
    fn chained_bases() {
        let dir = TempDir::new().unwrap();
        write_named(&dir, "grandbase.toml", MINIMAL_TOML);
        write_named(
            &dir,
            "middle.toml",
            "[meta]\nbase = \"grandbase.toml\"\n\n[logging]\nlevel = \"debug\"\n",
        );
        let top = write_named(
            &dir,
            "top.toml",
            "[meta]\nbase = \"middle.toml\"\n\n[server]\nbind = \"0.0.0.0:9000\"\n",
        );
        let cfg = load_from(&top, &Overrides::default()).unwrap();
        assert_eq!(cfg.log_level, "debug");
        assert_eq!(cfg.server.bind, "0.0.0.0:9000");
    }

    #[test]
    fn missing_base_errors() {
        let dir = TempDir::new().unwrap();
        let p = write_named(&dir, "overlay.toml", "[meta]\nbase = \"nonexistent.toml\"\n");
        let msg = load_from(&p, &Overrides::default()).unwrap_err().to_string();
        assert!(msg.contains("cannot read"));
    }

    #[test]
    fn cycle_detection() {
        let dir = TempDir::new().unwrap();
        let self_path = dir.path().join("self.toml");
        let content = format!("[meta]\nbase = \"{}\"\n\n{MINIMAL_TOML}", self_path.display());
        std::fs::write(&self_path, content).unwrap();
        let msg = load_from(&self_path, &Overrides::default()).unwrap_err().to_string();
        assert!(msg.contains("circular"));
    }

    #[test]
    fn shipped_configs_load() {
        let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("config");
        let dev = load_from(&root.join("default.toml"), &Overrides::default()).unwrap();
        assert!(!dev.environment.production);
        let prod = load_from(&root.join("production.toml"), &Overrides::default()).unwrap();
        assert!(prod.environment.production);
        assert_eq!(prod.environment.auth0.audience, dev.environment.auth0.audience);
    }
}
