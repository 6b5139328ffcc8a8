//! claimd — local coordination daemon for cooperating AI coding agents.

use anyhow::{Context, Result};
use claimd_core::Registry;
use claimd_daemon::config_resolution::{resolve, CliOverrides};
use claimd_daemon::{router, AppState};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// claimd — mutual-exclusion resource locking for cooperating agents.
#[derive(Parser, Debug)]
#[command(name = "claimd")]
#[command(about = "Local coordination daemon for cooperating AI coding agents")]
#[command(version)]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Address to bind the HTTP listener to.
    #[arg(long, value_name = "HOST:PORT")]
    bind: Option<String>,

    /// Reaper sweep interval, in seconds.
    #[arg(long, value_name = "SECS")]
    reaper_interval_secs: Option<u64>,

    /// Default work-unit TTL, in seconds.
    #[arg(long, value_name = "SECS")]
    default_work_unit_ttl_secs: Option<u64>,

    /// Default agent TTL, in seconds.
    #[arg(long, value_name = "SECS")]
    default_agent_ttl_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    claimd_core::logging::init();

    let cli_overrides = CliOverrides {
        bind: args.bind.clone(),
        reaper_interval_secs: args.reaper_interval_secs,
        default_work_unit_ttl_secs: args.default_work_unit_ttl_secs,
        default_agent_ttl_secs: args.default_agent_ttl_secs,
    };
    let config = resolve(cli_overrides, args.config.as_deref()).context("Failed to resolve configuration")?;

    info!("claimd starting, bind={}", config.bind);

    let registry = Arc::new(Registry::new(
        config.default_work_unit_ttl_secs,
        config.default_agent_ttl_secs,
    ));

    let cancel_token = CancellationToken::new();

    let cancel_for_reaper = cancel_token.clone();
    let reaper_registry = Arc::clone(&registry);
    let reaper_interval = Duration::from_secs(config.reaper_interval_secs);
    let reaper_handle = tokio::spawn(async move {
        claimd_daemon::reaper::run(reaper_registry, reaper_interval, cancel_for_reaper).await;
    });

    let cancel_for_signals = cancel_token.clone();
    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");

            tokio::select! {
                _ = ctrl_c => {
                    info!("Received SIGINT (Ctrl+C)");
                }
                _ = sigterm.recv() => {
                    info!("Received SIGTERM");
                }
            }
        }

        #[cfg(not(unix))]
        {
            ctrl_c.await.expect("failed to listen for Ctrl+C");
            info!("Received Ctrl+C");
        }

        cancel_for_signals.cancel();
    });

    let app = router(AppState::Ready(Arc::clone(&registry)));
    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    info!("claimd listening on {}", config.bind);

    let cancel_for_shutdown = cancel_token.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            cancel_for_shutdown.cancelled().await;
        })
        .await
        .context("HTTP server failed")?;

    cancel_token.cancel();
    reaper_handle.await.context("reaper task panicked")?;

    info!("claimd shutdown complete");
    Ok(())
}
