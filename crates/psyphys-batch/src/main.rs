//! psyphys command-line driver

mod cli;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Command, DemoArgs, RunArgs};
use psyphys_batch::{demo, BatchReport, BatchRunner, Manifest};
use psyphys_processing::ProcessingConfig;
use std::path::Path;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match cli.command {
        Command::Run(args) => run(args).await,
        Command::Demo(args) => demo(args).await,
        Command::Config => {
            println!("{}", ProcessingConfig::reference().to_json()?);
            Ok(())
        }
    }
}

async fn run(args: RunArgs) -> anyhow::Result<()> {
    let config = match &args.config {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            ProcessingConfig::from_json(&json)
                .with_context(|| format!("Invalid config {}", path.display()))?
        }
        None => ProcessingConfig::reference(),
    };

    let manifest = Manifest::load(&args.manifest)?;
    process(config, manifest, &args.out).await
}

async fn demo(args: DemoArgs) -> anyhow::Result<()> {
    let data_dir = args.out.join("data");
    let written = demo::write_demo_study(&data_dir, args.ecg_seconds, args.eda_seconds, args.seed)?;
    println!("Simulated {} recordings in {}", written.units.len(), data_dir.display());

    // Reload so the recording paths resolve against the data directory
    let manifest = Manifest::load(&data_dir.join("units.json"))?;

    process(ProcessingConfig::reference(), manifest, &args.out).await
}

async fn process(config: ProcessingConfig, manifest: Manifest, out: &Path) -> anyhow::Result<()> {
    let runner = BatchRunner::new(&config)?;
    let table = runner.run(manifest.units).await;

    println!(
        "Processed {} units: {} succeeded, {} failed",
        table.len(),
        table.results().len(),
        table.failures().len()
    );
    for failure in table.failures() {
        println!(
            "  {} {}: {} ({})",
            failure.tag, failure.kind, failure.message, failure.error_kind
        );
    }

    let written = BatchReport::new(config, table).write(out)?;
    for path in written {
        println!("Wrote {}", path.display());
    }
    Ok(())
}
