//! Turnstile CLI and REST API entry point.
//!
//! Binary name: `tstile`
//!
//! Parses CLI arguments, loads the service configuration, then either starts
//! the REST API server or prints the effective configuration.

mod cli;
mod http;
mod state;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use turnstile_infra::config::load_service_config;
use turnstile_observe::tracing_setup::{TracingOptions, init_tracing, shutdown_tracing};

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let otel = matches!(cli.command, Commands::Serve { otel: true, .. });
    init_tracing(&TracingOptions {
        default_filter: cli.log_filter().to_string(),
        json: cli.log_json,
        enable_otel: otel,
    })
    .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let config = load_service_config(cli.config.as_deref()).await;

    match cli.command {
        Commands::ShowConfig => {
            println!("{}", cli::render_config(&config)?);
        }

        Commands::Serve { port, host, .. } => {
            let state = AppState::init(config)?;
            tracing::info!(
                upstream = %state.config.upstream_base_url,
                max_concurrent = state.config.max_concurrent,
                retention_secs = state.config.retention_secs,
                "request scheduler ready"
            );

            let shutdown = CancellationToken::new();
            let cleanup = state
                .scheduler
                .spawn_cleanup(state.config.cleanup_interval(), shutdown.clone());

            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            tracing::info!(%addr, "turnstile API listening");

            let router = http::router::build_router(state);

            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            shutdown.cancel();
            if let Err(e) = cleanup.await {
                tracing::warn!(error = %e, "cleanup task ended abnormally");
            }
            tracing::info!("server stopped");
        }
    }

    shutdown_tracing();
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
