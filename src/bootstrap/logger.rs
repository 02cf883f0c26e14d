//! Logging initialisation via tracing-subscriber.
//!
//! Call [`init`] once at startup, after the effective level is resolved.

use tracing_subscriber::EnvFilter;

use crate::error::AppError;

/// Initialise the global tracing subscriber.
///
/// `level` is any `EnvFilter` directive (`"info"`, `"coffeeshop=debug,tower_http=info"`).
///
/// With `prefer_level` set (a `-v` flag was given), `level` wins and
/// `RUST_LOG` is only consulted when `level` does not parse. Otherwise
/// `RUST_LOG` wins and `level` is the fallback.
pub fn init(level: &str, prefer_level: bool) -> Result<(), AppError> {
    let filter = if prefer_level {
        match EnvFilter::try_new(level) {
            Ok(filter) => filter,
            Err(level_err) => EnvFilter::try_from_default_env().map_err(|env_err| {
                AppError::Logger(format!(
                    "invalid log level '{level}': {level_err}; RUST_LOG parse failed: {env_err}"
                ))
            })?,
        }
    } else {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(level))
            .map_err(|e| AppError::Logger(format!("invalid log level '{level}': {e}")))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| AppError::Logger(format!("failed to set subscriber: {e}")))?;

    Ok(())
}

/// Map a count of `-v` flags to a level, `None` meaning "use the configured level".
///
///   -v → warn, -vv → info, -vvv → debug, -vvvv+ → trace
pub fn verbosity_level(verbosity: u8) -> Option<&'static str> {
    match verbosity {
        0 => None,
        1 => Some("warn"),
        2 => Some("info"),
        3 => Some("debug"),
        _ => Some("trace"),
    }
}
