use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use client_core::{ControllerOptions, HttpBackendClient, SessionController};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod console;

#[derive(Parser, Debug)]
#[command(
    name = "docchat",
    about = "Upload PDF documents to an analysis backend and chat about them"
)]
struct Args {
    /// Backend base URL, e.g. http://localhost:5000
    #[arg(long)]
    server_url: Option<String>,
    /// Path to a TOML config file (defaults to ./docchat.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Per-request timeout in seconds; unset means wait indefinitely
    #[arg(long)]
    timeout_secs: Option<u64>,
    /// Clear the selected files once an analysis succeeds
    #[arg(long)]
    clear_after_analyze: bool,
    /// Upload and analyze the given files right away
    #[arg(long)]
    analyze: bool,
    #[arg(short, long)]
    verbose: bool,
    /// PDF files to select on startup
    files: Vec<PathBuf>,
}

fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let mut settings = config::load_settings(args.config.as_deref())?;
    if let Some(server_url) = args.server_url {
        settings.server_url = server_url;
    }
    if let Some(timeout_secs) = args.timeout_secs {
        settings.request_timeout_secs = Some(timeout_secs);
    }
    if args.clear_after_analyze {
        settings.retain_files_after_analyze = false;
    }

    let backend = HttpBackendClient::with_timeout(&settings.server_url, settings.request_timeout())
        .with_context(|| format!("cannot use server url '{}'", settings.server_url))?;
    info!(server_url = backend.server_url(), "starting docchat session");

    let controller = SessionController::with_options(
        Arc::new(backend),
        ControllerOptions {
            notification_ttl: settings.notification_ttl(),
            retain_files_after_analyze: settings.retain_files_after_analyze,
        },
    );

    console::run(controller, args.files, args.analyze).await
}
