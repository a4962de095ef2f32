pub mod actions;
pub mod cli;
pub mod config;
pub mod error;
pub mod host;
pub mod services;

#[cfg(test)]
mod test_support;

use clap::Parser;
use std::io::BufRead;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use actions::ArchiveMoverAction;
use cli::Cli;
use error::ConfigurationError;
use host::menu::parse_command;
use host::surface::{ControlSurface, TerminalSurface};
use host::{ActionHost, HostCommand, HostHandle};

/// Load `.env` and install the tracing subscriber.
///
/// Default: warn for dependencies, info for this crate. Use RUST_LOG=debug
/// for per-event logs.
pub fn init_tracing() {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,archive_mover=info")),
        )
        .init();
}

/// Build the host from the command line and run it until `exit` or Ctrl-C
pub async fn run() -> Result<(), ConfigurationError> {
    let cli = Cli::parse();
    let host_config = cli.host_config();
    let mover_config = cli.archive_mover_config()?;

    let surface = Arc::new(TerminalSurface::init(&host_config.name, &host_config.icon));
    let mut host = ActionHost::new(host_config, surface.clone());
    host.register(Arc::new(ArchiveMoverAction::new(mover_config)?))?;

    let handle = host.handle();
    spawn_stdin_reader(handle.clone());

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, shutting down");
            handle.send(HostCommand::Exit);
        }
    });

    host.run().await;
    surface.teardown();
    Ok(())
}

/// Forward typed commands to the control loop.
///
/// Runs on a plain thread: a blocking stdin read would otherwise hold up
/// runtime shutdown.
fn spawn_stdin_reader(handle: HostHandle) {
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if line.trim().is_empty() {
                continue;
            }

            match parse_command(&line) {
                Some(command) => {
                    if !handle.send(command) {
                        break;
                    }
                }
                None => tracing::warn!(
                    input = %line.trim(),
                    "Unknown command (try: start [name], stop [name], status, exit)"
                ),
            }
        }
        tracing::debug!("Command input closed");
    });
}
