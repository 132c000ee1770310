//! Ploston Enterprise server.
//!
//! Validates the license before anything else starts. Without a valid
//! license the process prints renewal guidance and exits non-zero.
//!
//! Usage:
//!   PLOSTON_LICENSE_KEY=... ploston-enterprise-server --port 8080

use std::{io::Write, process::ExitCode};
use anyhow::{Context, Result};
use clap::Parser;
use ploston_entitlements::PluginRegistry;
use ploston_license::LicenseConfig;
use ploston_server::{bootstrap, build_router, failure_message, Bootstrap};
use tracing::{info, warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "ploston-enterprise-server")]
#[command(about = "Ploston Enterprise server with license-gated capabilities")]
struct Args {
    /// Port for the HTTP API
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Address to bind the HTTP API to
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.as_str().to_lowercase()));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    info!("Ploston Enterprise starting...");

    // Validation may block on the license server, so it runs before the runtime exists.
    let config = LicenseConfig::from_env();
    let boot = match bootstrap(&config) {
        Ok(boot) => boot,
        Err(e) => {
            let _ = std::io::stderr().write_all(failure_message(&e).as_bytes());
            return ExitCode::from(u8::try_from(e.exit_code()).unwrap_or(1));
        }
    };

    if let Some(license) = boot.state().license() {
        info!(
            license_id = %license.id(),
            customer = license.customer(),
            seats = license.seats(),
            "License valid"
        );
    }

    match serve(&args, &boot) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("[Ploston Enterprise] Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn serve(args: &Args, boot: &Bootstrap) -> Result<()> {
    boot.plugins().start_all().context("Failed to start plugins")?;
    info!(plugins = ?boot.plugins().running_plugins(), "Plugins running");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build async runtime")?;

    let router = build_router(boot.capabilities(env!("CARGO_PKG_VERSION")));
    let addr = format!("{}:{}", args.host, args.port);

    let result = runtime.block_on(async move {
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind HTTP API on {addr}"))?;
        info!("HTTP API listening on http://{}", addr);
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("HTTP API server failed")
    });

    info!("Shutting down...");
    boot.plugins().shutdown_all();
    result
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
