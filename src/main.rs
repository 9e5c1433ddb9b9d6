//! botswarm - Bot swarm load generator
//!
//! Main entry point for the botswarm CLI.

use botswarm::commands::Cli;
use botswarm::config::{validate_config_result, SwarmConfig};
use botswarm::logging::{self, Verbosity};
use botswarm::prompt::{resolve_inputs, Prompter, RunInputs};
use botswarm::session::memory::{ConnectBehavior, MemoryConnector, MemoryWorld};
use botswarm::session::{Connector, TcpConnector};
use botswarm::style;
use botswarm::swarm::SwarmController;
use clap::Parser;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;

/// Ready delay of the simulated server in `--dry-run`
const DRY_RUN_READY_DELAY: Duration = Duration::from_millis(50);

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = logging::init(Verbosity::from_flags(cli.quiet, cli.verbose)) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    if let Err(e) = run(cli).await {
        eprintln!("{} {}", style::error("Error:"), e);
        process::exit(1);
    }
}

async fn run(cli: Cli) -> botswarm::Result<()> {
    let mut config = match &cli.config {
        Some(path) => SwarmConfig::load(path)?,
        None => SwarmConfig::load_or_default()?,
    };
    cli.apply_overrides(&mut config);
    validate_config_result(&config)?;

    let RunInputs {
        endpoint,
        count,
        action,
    } = resolve_inputs(&cli, &Prompter::new())?;

    let connector: Arc<dyn Connector> = if cli.dry_run {
        tracing::info!("Dry run: using in-memory transport");
        Arc::new(MemoryConnector::with_world(
            ConnectBehavior::ReadyAfter(DRY_RUN_READY_DELAY),
            MemoryWorld::sample(),
        ))
    } else {
        Arc::new(TcpConnector::new())
    };

    let print = !cli.json && !cli.quiet;
    if print {
        println!("{}", style::banner());
        println!(
            "Starting {} bots against {}{}",
            style::header(&count.to_string()),
            style::endpoint(&endpoint.to_string()),
            action
                .as_deref()
                .map(|a| format!(" with action {}", style::dim(a)))
                .unwrap_or_default()
        );
        println!();
    }

    let mut swarm = SwarmController::new(config, connector);
    let stats = swarm.run(&endpoint, count, action.as_deref()).await;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else if !cli.quiet {
        println!("{}", style::summary(&stats));
        println!();
    }

    if print {
        let mut events = swarm.subscribe();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        if let Some(line) = style::event_line(&event) {
                            println!("{}", line);
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "Event printer lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });
    }

    wait_for_termination().await?;

    if print {
        println!();
        println!("{}", style::warning("Shutting down..."));
    }
    swarm.shutdown();
    swarm.wait().await;

    Ok(())
}

#[cfg(unix)]
async fn wait_for_termination() -> botswarm::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).map_err(|e| {
        botswarm::SwarmError::Other(format!("Failed to set up SIGTERM handler: {}", e))
    })?;
    let mut sigint = signal(SignalKind::interrupt()).map_err(|e| {
        botswarm::SwarmError::Other(format!("Failed to set up SIGINT handler: {}", e))
    })?;

    tokio::select! {
        _ = sigterm.recv() => tracing::info!("Received SIGTERM"),
        _ = sigint.recv() => tracing::info!("Received SIGINT"),
    }
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_termination() -> botswarm::Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
