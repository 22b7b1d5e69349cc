//! Daemon entry point.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use docker_resolv_sync::{SyncConfig, SyncDaemon};

/// Stop the container runtime from clobbering resolv.conf.
#[derive(Parser, Debug)]
#[command(name = "docker-resolv-sync", version, about)]
struct Cli {
    /// Enable debug logging.
    #[arg(short, long)]
    debug: bool,

    /// Re-read the source and reconcile every target every N seconds.
    /// 0 or negative disables the periodic pass.
    #[arg(short, long, default_value_t = 0)]
    refresh: i64,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    if cli.debug {
        tracing::debug!("debug logging enabled");
    }

    let config = SyncConfig::default().with_refresh_secs(cli.refresh);

    let daemon = match SyncDaemon::new(config) {
        Ok(daemon) => daemon,
        Err(e) => {
            tracing::error!(error = %e, "startup failed");
            return ExitCode::FAILURE;
        }
    };

    let shutdown = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                // Without a signal handler a graceful stop is impossible;
                // keep running rather than shutting down by accident.
                tracing::error!(error = %e, "failed to listen for interrupt");
                std::future::pending::<()>().await;
            }
        }
    };

    daemon.run(shutdown).await;
    ExitCode::SUCCESS
}
