use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::info;

use tidescale_core::DaemonConfig;
use tidescaled::{Daemon, ObjectBundle, telemetry};

#[derive(Parser)]
#[command(name = "tidescaled", about = "Tidescale autoscaling daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the autoscaling controller until interrupted.
    Run {
        /// Path to tidescale.toml.
        #[arg(long, default_value = "tidescale.toml")]
        config: PathBuf,
    },
    /// Load policies, clusters and replica sets into the state store.
    Apply {
        #[arg(long, default_value = "tidescale.toml")]
        config: PathBuf,

        /// JSON object bundle.
        #[arg(long)]
        file: PathBuf,
    },
    /// Run a single pass over one policy and print the report.
    Sync {
        #[arg(long, default_value = "tidescale.toml")]
        config: PathBuf,

        /// Policy key, `namespace/name`.
        #[arg(long)]
        policy: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Run { config } => {
            let config = load_config(&config)?;
            run(&config).await
        }
        Command::Apply { config, file } => {
            let config = load_config(&config)?;
            let daemon = Daemon::open(&config)?;
            let summary = ObjectBundle::from_file(&file)?.apply(daemon.store())?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(())
        }
        Command::Sync { config, policy } => {
            let config = load_config(&config)?;
            let daemon = Daemon::open(&config)?;
            let summary = daemon.sync_policy(&policy)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(())
        }
    }
}

fn load_config(path: &Path) -> anyhow::Result<DaemonConfig> {
    let config = DaemonConfig::from_file(path)?;
    telemetry::init(&config.logging)?;
    info!(path = ?path, "configuration loaded");
    Ok(config)
}

async fn run(config: &DaemonConfig) -> anyhow::Result<()> {
    info!("Tidescale daemon starting");
    let daemon = Daemon::open(config)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(daemon.run(shutdown_rx));

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    let _ = shutdown_tx.send(true);
    handle.await?;

    info!("Tidescale daemon stopped");
    Ok(())
}
