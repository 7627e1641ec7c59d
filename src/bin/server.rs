//! sqldrill Server Binary
//!
//! Starts the practice server: builds the engine pool, loads the question
//! dataset into every instance, then serves the HTTP API until SIGINT/SIGTERM.
//!
//! ## Usage
//!
//! ```bash
//! # Start server with config.toml / config.local.toml / SQLDRILL_* env
//! cargo run --bin sqldrill-server
//!
//! # Explicit config file and address
//! cargo run --bin sqldrill-server -- --config deploy.toml --host 0.0.0.0 --port 9000
//! ```
//!
//! ## Logging
//!
//! - `SQLDRILL_LOG` overrides `logging.level` (any `EnvFilter` directive)
//! - `SQLDRILL_LOG_FILE` appends logs to a file instead of stderr

use sqldrill::config::LoggingConfig;
use sqldrill::protocol::rest;
use sqldrill::{Config, PracticeService};

use anyhow::Context;
use clap::Parser;
use std::env;
use std::sync::Arc;
use std::sync::OnceLock;

static TRACE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

#[derive(Parser)]
#[command(name = "sqldrill-server", version, about = "Pooled SQL practice server")]
struct Args {
    /// Configuration file (defaults to config.toml + config.local.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Override http.host
    #[arg(long)]
    host: Option<String>,

    /// Override http.port
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::from_file(path).with_context(|| format!("loading {path}"))?,
        None => Config::load().context("loading configuration")?,
    };
    if let Some(host) = args.host {
        config.http.host = host;
    }
    if let Some(port) = args.port {
        config.http.port = port;
    }
    config.validate()?;

    init_tracing(&config.logging);

    tracing::info!(
        pool_size = config.pool.size,
        location = %config.pool.location,
        idle_timeout_secs = config.sessions.idle_timeout_secs,
        sweep_interval_secs = config.sessions.sweep_interval_secs,
        max_sessions = config.sessions.max_sessions,
        "sqldrill_starting"
    );

    // Pool construction and dataset bootstrap are fatal on failure
    let service = PracticeService::from_config(&config).context("initializing engine pool")?;
    let service = Arc::new(service);

    rest::start_http_server(service, &config.http)
        .await
        .map_err(|e| anyhow::anyhow!(e))
        .context("http server")?;

    Ok(())
}

fn init_tracing(logging_config: &LoggingConfig) {
    // SQLDRILL_LOG takes precedence over the config file level
    let level = env::var("SQLDRILL_LOG").unwrap_or_else(|_| logging_config.level.clone());
    let filter = tracing_subscriber::EnvFilter::try_new(&level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let json = logging_config.format == "json";

    let (non_blocking, guard) = match env::var("SQLDRILL_LOG_FILE") {
        Ok(path) => match std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
        {
            Ok(file) => tracing_appender::non_blocking(file),
            Err(e) => {
                eprintln!("ERROR: Unable to open SQLDRILL_LOG_FILE '{path}': {e}");
                tracing_appender::non_blocking(std::io::stderr())
            }
        },
        Err(_) => tracing_appender::non_blocking(std::io::stderr()),
    };
    let _ = TRACE_GUARD.set(guard);

    let base = || {
        tracing_subscriber::fmt()
            .with_env_filter(filter.clone())
            .with_ansi(false)
            .with_thread_names(true)
            .with_writer(non_blocking.clone())
    };

    let subscriber: Box<dyn tracing::Subscriber + Send + Sync> = if json {
        Box::new(base().json().finish())
    } else {
        Box::new(base().compact().finish())
    };

    let _ = tracing::subscriber::set_global_default(subscriber);
}
