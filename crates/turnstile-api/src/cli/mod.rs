//! CLI command definitions for the `tstile` binary.
//!
//! Uses clap derive macros for argument parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use turnstile_types::config::ServiceConfig;

/// Queue chat turns in front of a rate-limited completion API.
#[derive(Parser)]
#[command(name = "tstile", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Path to the TOML config file (defaults to ./turnstile.toml).
    #[arg(short, long, global = true, env = "TURNSTILE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP API server.
    Serve {
        /// Port to listen on.
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Export spans through OpenTelemetry (stdout exporter).
        #[arg(long)]
        otel: bool,
    },

    /// Print the effective configuration after file and env overrides.
    ShowConfig,
}

impl Cli {
    /// Filter directive used when `RUST_LOG` is unset.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 if self.quiet => "error",
            0 => "info",
            1 => "info,turnstile=debug",
            _ => "trace",
        }
    }
}

/// Render the effective configuration as pretty JSON. The API key is
/// never serialized.
pub fn render_config(config: &ServiceConfig) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(config)?)
}
