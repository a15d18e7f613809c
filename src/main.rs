//! Loadgauge HTTP server
//!
//! Starts an Axum web server exposing weighted load endpoints and `/metrics`.

use clap::Parser;
use loadgauge::{
    cli::{Cli, Command, generate_config_template},
    server, telemetry,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Some(Command::Config { output }) = &cli.command {
        let template = generate_config_template();
        match output {
            Some(path) => {
                std::fs::write(path, template)?;
                eprintln!("Configuration template written to {}", path);
            }
            None => print!("{}", template),
        }
        return Ok(());
    }

    let config = cli.resolve_config()?;
    telemetry::init(&config.observability.log_level);

    tracing::info!(
        listen_addr = %config.server.listen_addr,
        display = %config.server.display,
        "Starting Loadgauge"
    );

    if let Err(e) = server::serve(config).await {
        tracing::error!(error = %e, "Server terminated");
        return Err(e.into());
    }

    Ok(())
}
