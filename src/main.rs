//! Bike rental service binary
//!
//! ```sh
//! # Run with default config (~/.config/bike-rental/config.toml)
//! bike-rental-service
//!
//! # Custom config path and port
//! bike-rental-service --config /etc/bike-rental/config.toml --port 8080
//!
//! # Validate config without starting
//! bike-rental-service --check
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};

use bike_rental::config::{AppConfig, CONFIG_PATH_ENV};
use bike_rental::server::{init_tracing, ServerHandle, ServerOptions};

/// Bike rental reservation backend.
#[derive(Parser, Debug)]
#[command(name = "bike-rental-service", version, about)]
struct Cli {
    /// Path to the configuration file (TOML).
    #[arg(short, long, env = CONFIG_PATH_ENV)]
    config: Option<PathBuf>,

    /// Override the REST API listen port.
    #[arg(long)]
    port: Option<u16>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(short, long)]
    log_level: Option<String>,

    /// Validate the configuration file and exit without starting the server.
    #[arg(long)]
    check: bool,

    /// Skip database migrations on startup.
    #[arg(long)]
    no_migrate: bool,

    /// Skip creating the default admin user.
    #[arg(long)]
    no_admin: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();

    let config_path = cli.config.unwrap_or_else(bike_rental::default_config_path);

    let (mut config, load_error) = match AppConfig::load(&config_path) {
        Ok(cfg) => (cfg, None),
        Err(e) => {
            let mut cfg = AppConfig::default();
            cfg.apply_env_overrides();
            (cfg, Some(e))
        }
    };
    if let Some(ref level) = cli.log_level {
        config.logging.level = level.clone();
    }
    init_tracing(&config);

    let config_ok = load_error.is_none();
    match load_error {
        None => info!("Configuration loaded from {}", config_path.display()),
        Some(e) => {
            error!("{}", e);
            error!("Using default configuration.");
        }
    }

    if let Some(port) = cli.port {
        info!("CLI override: port = {}", port);
        config.server.port = port;
    }

    if cli.check {
        if !config_ok {
            return Err(format!("invalid configuration: {}", config_path.display()).into());
        }
        println!("Configuration is valid");
        println!("   Config file : {}", config_path.display());
        println!("   API address : {}", config.api_address());
        println!("   Database    : {}", config.database.url);
        println!("   Log level   : {}", config.logging.level);
        return Ok(());
    }

    let handle = ServerHandle::start(ServerOptions {
        config,
        auto_migrate: !cli.no_migrate,
        create_default_admin: !cli.no_admin,
    })
    .await?;

    handle.install_signal_handler();
    info!("Press Ctrl+C to shutdown gracefully.");

    handle.wait().await;
    Ok(())
}
