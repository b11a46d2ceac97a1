//! customscalerd: the customscaler daemon.
//!
//! Single binary that assembles:
//! - State store (redb)
//! - Metric and workload backends
//! - Controller (work queue + reconcile workers)
//! - REST API
//!
//! # Usage
//!
//! ```text
//! customscalerd run --config customscaler.toml --data-dir /var/lib/customscaler
//! customscalerd check --config customscaler.toml
//! ```

mod config;
mod daemon;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::config::{DaemonConfig, LogFormat};

const DEFAULT_FILTER: &str = "info,customscalerd=debug,customscaler=debug";

#[derive(Parser)]
#[command(name = "customscalerd", about = "customscaler daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the store, controller and API server.
    Run {
        /// Path to the TOML config file. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Data directory for persistent state (overrides `server.data_dir`).
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Port to listen on (overrides `server.port`).
        #[arg(long)]
        port: Option<u16>,
    },
    /// Validate a config file and the policies it seeds.
    Check {
        #[arg(long)]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            config,
            data_dir,
            port,
        } => {
            let mut config = match config {
                Some(path) => DaemonConfig::from_file(&path)?,
                None => DaemonConfig::default(),
            };
            if let Some(data_dir) = data_dir {
                config.server.data_dir = data_dir;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            init_tracing(config.log_format);
            daemon::run(config).await
        }
        Command::Check { config } => check(&config),
    }
}

fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    match format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
    }
}

fn check(path: &Path) -> anyhow::Result<()> {
    let config = DaemonConfig::from_file(path)?;
    config.controller_configs()?;

    let results = daemon::check_policies(&config.policies);
    let mut invalid = 0;
    for (key, result) in &results {
        match result {
            Ok(()) => println!("ok       {key}"),
            Err(e) => {
                invalid += 1;
                println!("invalid  {key}: {e}");
            }
        }
    }

    if invalid > 0 {
        anyhow::bail!("{invalid} of {} policies invalid", results.len());
    }
    println!(
        "{}: {} policies, {} workloads",
        path.display(),
        results.len(),
        config.workloads.len()
    );
    Ok(())
}
