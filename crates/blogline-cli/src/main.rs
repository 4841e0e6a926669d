//! Blogline CLI - a command-line client for the blogline blogging platform.
//!
//! Every command shares one `HttpClient`, so tokens renewed during a command
//! are persisted for the next one.

mod cli;
mod commands;

use std::io;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::broadcast;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use blogline_core::api::ReqwestTransport;
use blogline_core::auth::spawn_hydration;
use blogline_core::{ApiError, Config, HttpClient, Notice, SessionState};

use cli::Cli;
use commands::App;

// ============================================================================
// Constants
// ============================================================================

/// Directory for rolling log files; logs go to stderr when unset
const LOG_DIR_ENV: &str = "BLOGLINE_LOG_DIR";

/// Log file name prefix inside the log directory
const LOG_FILE_PREFIX: &str = "blogline.log";

/// Initialize the tracing subscriber for logging.
///
/// The returned guard flushes the file writer and must live until exit.
fn init_tracing() -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    match std::env::var(LOG_DIR_ENV).ok().filter(|dir| !dir.trim().is_empty()) {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .with(filter)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(io::stderr))
                .with(filter)
                .init();
            None
        }
    }
}

fn print_notices(notices: &mut broadcast::Receiver<Notice>) {
    while let Ok(notice) = notices.try_recv() {
        eprintln!("{}", notice);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let _log_guard = init_tracing();
    let cli = Cli::parse();

    let config = Config::load().context("Failed to load config")?;
    let api_url = cli
        .api_url
        .clone()
        .unwrap_or_else(|| config.resolved_api_url());
    info!(url = %api_url, "Blogline CLI starting");

    let transport = ReqwestTransport::new(&api_url, config.request_timeout_secs())
        .context("Failed to build HTTP client")?;
    let credentials = config
        .credential_store()
        .context("Failed to open credential store")?;
    let http = HttpClient::new(Arc::new(transport), credentials, Arc::new(SessionState::new()));
    let mut notices = http.subscribe_notices();

    let hydration = (!cli.command.skips_hydration()).then(|| spawn_hydration(http.clone()));

    let mut app = App {
        http,
        config,
        hydration,
    };
    let result = app.run(cli.command).await;
    print_notices(&mut notices);

    if let Err(ref e) = result {
        if e.downcast_ref::<ApiError>().is_some_and(ApiError::ends_session) {
            eprintln!("Run `blogline login` to sign in again.");
        }
    }
    result
}
