use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::signal;
use tracing::{debug, info};

use pulsewatch::config::MonitorConfig;
use pulsewatch::engine::Runner;
use pulsewatch::probe::Prober;
use pulsewatch::reporters::{LogReporter, Reporter};
use pulsewatch::tracker::DownCounter;

#[derive(Debug, Parser)]
#[command(name = "pulsewatch", version, about = "HTTP uptime monitor")]
struct Cli {
    /// Path to the checks file
    #[arg(short, long, global = true, env = "PULSEWATCH_CONFIG", default_value = "checks.yml")]
    config: PathBuf,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Perform all checks once and log the results
    Check,
    /// Run checks every poll interval and notify the configured reporters
    Server,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let level = if cli.verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .with_ansi(true)
        .init();

    let config = MonitorConfig::load(&cli.config)?;
    let prober = Prober::new(config.server.request_timeout())?;

    match cli.command {
        Command::Check => run_once(config, prober).await,
        Command::Server => serve(config, prober).await.map(|()| ExitCode::SUCCESS),
    }
}

async fn run_once(config: MonitorConfig, prober: Prober) -> Result<ExitCode> {
    let reporters: Vec<Box<dyn Reporter>> = vec![Box::new(LogReporter)];
    let runner = Runner::new(prober, reporters);
    let mut down = DownCounter::new();

    let summary = runner.run_checks(&config.checks, &mut down).await;
    summary.log();
    if summary.all_up() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

async fn serve(config: MonitorConfig, prober: Prober) -> Result<()> {
    info!("Server started.");
    let runner = Runner::new(prober, config.build_reporters()?);
    let poll_interval = config.server.poll_interval();
    let mut down = DownCounter::new();

    let cycles = async {
        loop {
            debug!("Running checks...");
            let summary = runner.run_checks(&config.checks, &mut down).await;
            summary.log();
            if down.down_count() > 0 {
                debug!("{} checks currently down", down.down_count());
            }
            debug!("Sleeping for {} seconds.", poll_interval.as_secs());
            tokio::time::sleep(poll_interval).await;
        }
    };

    tokio::select! {
        _ = cycles => Ok(()),
        res = signal::ctrl_c() => {
            res?;
            info!("Shutdown signal received. Stopping monitor...");
            Ok(())
        }
    }
}
