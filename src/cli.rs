//! Command-line interface for Loadgauge
//!
//! Flags override values from the optional config file, which override the
//! built-in defaults.

use crate::config::Config;
use crate::error::AppResult;
use clap::{Parser, Subcommand};

/// Synthetic HTTP load emitter for exercising metrics pipelines
#[derive(Parser)]
#[command(name = "loadgauge")]
#[command(version)]
#[command(about = "Synthetic HTTP load emitter for exercising metrics pipelines")]
#[command(
    long_about = "Loadgauge serves a fixed set of weighted endpoints. Each hit moves a shared \
    load gauge by the endpoint's weight and counts the request, producing controllable \
    Prometheus signal at /metrics."
)]
pub struct Cli {
    /// Path to an optional TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// The address the server will listen to
    #[arg(long)]
    pub listen_addr: Option<String>,

    /// The message the server will respond with
    #[arg(long)]
    pub display: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate a template configuration file
    Config {
        /// Output file path (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<String>,
    },
}

impl Cli {
    /// Resolve the effective configuration
    ///
    /// Loads the config file when one was given, applies flag overrides and
    /// validates the result.
    pub fn resolve_config(&self) -> AppResult<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };

        if let Some(listen_addr) = &self.listen_addr {
            config.server.listen_addr = listen_addr.clone();
        }
        if let Some(display) = &self.display {
            config.server.display = display.clone();
        }
        if let Some(log_level) = &self.log_level {
            config.observability.log_level = log_level.clone();
        }

        config.validate()?;
        Ok(config)
    }
}

/// Generate template configuration content
pub fn generate_config_template() -> &'static str {
    r#"# Loadgauge Configuration
# =======================

[server]
# Address to listen on. ":port" binds all interfaces.
listen_addr = ":9090"

# Body returned (followed by a newline) by every weighted endpoint
display = "nothing"

[observability]
# Log level: "trace", "debug", "info", "warn", "error"
# RUST_LOG takes precedence when set.
log_level = "info"
"#
}
