//! clusterpulse CLI binary entrypoint.

use std::io;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use pulse_cli::cli::{Cli, Commands};
use pulse_cli::commands::{DigestCommand, ReportCommand};
use pulse_cli::output::OutputFormat;
use pulse_cli::snapshots::Snapshots;
use pulse_monitor::{ClusterMonitor, MonitorConfig};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => MonitorConfig::from_file(path)?,
        None => MonitorConfig::default(),
    }
    .with_env_overrides()?;

    let snapshots = Snapshots::load(&cli.snapshot)
        .with_context(|| format!("loading snapshots from {}", cli.snapshot.display()))?;
    let cluster = snapshots.resolve(cli.cluster.as_deref())?;
    let monitor = ClusterMonitor::new(Arc::new(snapshots.into_registry()), config)?;

    let format = OutputFormat::new(cli.format);
    let mut stdout = io::stdout().lock();

    match cli.command {
        Commands::Overview { refresh } => {
            let cmd = ReportCommand::new(&monitor, &cluster);
            cmd.overview(&mut stdout, &format, refresh).await?;
        }
        Commands::Nodes { refresh } => {
            let cmd = ReportCommand::new(&monitor, &cluster);
            cmd.nodes(&mut stdout, &format, refresh).await?;
        }
        Commands::Pods { namespace, refresh } => {
            let cmd = ReportCommand::new(&monitor, &cluster);
            cmd.pods(&mut stdout, &format, namespace.as_deref(), refresh)
                .await?;
        }
        Commands::Namespaces { refresh } => {
            let cmd = ReportCommand::new(&monitor, &cluster);
            cmd.namespaces(&mut stdout, &format, refresh).await?;
        }
        Commands::Digest { target } => {
            let cmd = DigestCommand::new(&monitor, &cluster);
            cmd.execute(&mut stdout, &format, &target).await?;
        }
    }
    Ok(())
}
