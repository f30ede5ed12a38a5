//! Application entry point for the `airgradient-proxy` service.
//!
//! Startup sequence:
//! - Loading configuration from environment variables or `.env`
//! - Initializing structured logging/tracing
//! - Connecting the Timestream client once for the whole process
//! - Mounting the API routes via the `routes` gateway (EMBP pattern)
//! - Binding the Axum HTTP server and serving requests
//!
//! # Environment Variables
//! - `TIMESTREAM_REGION` (optional) – AWS region (default: `us-east-1`)
//! - `PORT` (optional) – listen port (default: 8080)
//! - `AXUM_LOG_LEVEL` (optional) – log verbosity (default: `debug`)
//! - `AWS_LOG_LEVEL` (optional) – verbosity of the AWS SDK crates (default: `warn`)
use std::{env, io::IsTerminal, net::SocketAddr};

use anyhow::Result;
use axum::Router;
use dotenvy::dotenv;
use tracing_subscriber::filter::EnvFilter;

use airgradient_proxy::{config, routes, TimestreamStore};

// ---

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    dotenv().ok();
    init_tracing();

    let cfg = config::load_from_env()?;
    cfg.log_config();

    tracing::info!("Connecting to Timestream in {}", cfg.region);
    let store = TimestreamStore::connect(&cfg.region).await?;
    tracing::info!("Timestream endpoint discovered");

    let app: Router = routes::router(store);

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ---

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins when set. Otherwise the service logs at `AXUM_LOG_LEVEL`
/// (default `debug`) and the SDK stack (`aws_*`, `hyper`) at `AWS_LOG_LEVEL`
/// (default `warn`). `FORCE_COLOR` overrides TTY detection.
fn init_tracing() {
    // ---
    let use_color = match env::var("FORCE_COLOR").as_deref() {
        Ok("1") | Ok("true") | Ok("yes") => true,
        Ok("0") | Ok("false") | Ok("no") => false,
        _ => std::io::stdout().is_terminal(),
    };

    let env_filter = if env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = level_from_env("AXUM_LOG_LEVEL", "debug");
        let aws = level_from_env("AWS_LOG_LEVEL", "warn");
        EnvFilter::new(format!(
            "{level},aws_config={aws},aws_sdk_timestreamwrite={aws},\
             aws_smithy_runtime={aws},aws_smithy_runtime_api={aws},hyper={aws}"
        ))
    };

    tracing_subscriber::fmt()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_env_filter(env_filter)
        .with_ansi(use_color)
        .compact()
        .init();
}

/// Read a log level from `var`, falling back to `default` on unset or junk.
fn level_from_env(var: &str, default: &'static str) -> &'static str {
    match env::var(var).ok().as_deref() {
        Some("trace") => "trace",
        Some("debug") => "debug",
        Some("info") => "info",
        Some("warn") => "warn",
        Some("error") => "error",
        _ => default,
    }
}
