//! Coffee shop API entry point.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Load config
//!   3. Resolve effective log level (CLI `-v` flags > env > config)
//!   4. Init logger once
//!   5. Open the drink store (resetting it when asked)
//!   6. Build the token verifier and router
//!   7. Serve until Ctrl-C

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use coffeeshop::api::{self, AppState};
use coffeeshop::auth::Auth0Verifier;
use coffeeshop::error::AppError;
use coffeeshop::store::DrinkStore;
use coffeeshop::{config, logger};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    // Load .env if present; ignore errors (file is optional).
    let _ = dotenvy::dotenv();

    let args = parse_cli_args();

    let config = config::load(args.config_path.as_deref())?;

    if args.print_environment {
        let json = serde_json::to_string_pretty(&config.environment.to_frontend_json())
            .map_err(|e| AppError::Config(format!("cannot render environment: {e}")))?;
        println!("{json}");
        return Ok(());
    }

    let effective_log_level = args.log_level.unwrap_or(config.log_level.as_str());
    logger::init(effective_log_level, args.log_level.is_some())?;

    info!(
        production = config.environment.production,
        api_server_url = %config.environment.api_server_url,
        auth0_domain = %config.environment.auth0.domain(),
        effective_log_level = %effective_log_level,
        "config loaded"
    );

    let store = match &config.database.path {
        Some(path) => DrinkStore::open(path)?,
        None => DrinkStore::open_in_memory()?,
    };
    // An in-memory store starts empty, so it is always seeded.
    if args.reset_db || config.database.reset_on_start || config.database.path.is_none() {
        store.drop_and_create_all()?;
    }

    let verifier = Auth0Verifier::new(&config.environment.auth0, &config.auth)?;

    let state = AppState {
        store: Arc::new(store),
        verifier: Arc::new(verifier),
        environment: Arc::new(config.environment.clone()),
    };
    let router = api::build_router(state, &config.server)?;

    let shutdown = CancellationToken::new();
    let ctrlc_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c received, initiating shutdown");
            ctrlc_token.cancel();
        }
    });

    api::serve(&config.server.bind, router, shutdown).await
}

struct CliArgs {
    log_level: Option<&'static str>,
    config_path: Option<String>,
    print_environment: bool,
    reset_db: bool,
}

fn parse_cli_args() -> CliArgs {
    let mut verbosity = 0u8;
    let mut config_path = None;
    let mut print_environment = false;
    let mut reset_db = false;

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        if arg == "--" {
            break;
        }

        match arg.as_str() {
            "-h" | "--help" => {
                println!("Usage: coffeeshop [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -h, --help                 Print help");
                println!("  -f, --config <PATH>        Path to configuration file (default: config/default.toml)");
                println!("      --print-environment    Print the front-end environment as JSON and exit");
                println!("      --reset-db             Drop and reseed the drinks table before serving");
                println!("  -v, -vv, -vvv, -vvvv       Increase logging verbosity");
                std::process::exit(0);
            }
            "-f" | "--config" => {
                if let Some(path) = iter.next() {
                    config_path = Some(path);
                } else {
                    eprintln!("error: -f/--config requires a path argument");
                    std::process::exit(1);
                }
            }
            "--print-environment" => print_environment = true,
            "--reset-db" => reset_db = true,
            "--verbose" => verbosity = verbosity.saturating_add(1),
            a if a.starts_with('-') && a.len() > 1 && a.chars().skip(1).all(|c| c == 'v') => {
                verbosity = verbosity.saturating_add((a.len() - 1) as u8);
            }
            other => eprintln!("warning: ignoring unknown argument '{other}'"),
        }
    }

    CliArgs {
        log_level: logger::verbosity_level(verbosity),
        config_path,
        print_environment,
        reset_db,
    }
}
