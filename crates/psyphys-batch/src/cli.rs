use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "psyphys",
    version,
    about = "Extract heartbeat and skin-conductance markers from physiological recordings",
    long_about = "Runs the ECG R-peak and EDA skin-conductance-response pipelines over every\n\
                  (participant, condition) unit listed in a manifest and writes one result\n\
                  table per signal kind."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Command {
    /// Process the units listed in a manifest
    Run(RunArgs),
    /// Write a simulated study and process it
    Demo(DemoArgs),
    /// Print the reference configuration as JSON
    Config,
}

#[derive(Args)]
pub struct RunArgs {
    /// Manifest listing the recordings (JSON)
    #[arg(long)]
    pub manifest: PathBuf,

    /// Processing configuration (JSON); the reference configuration when omitted
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Output directory for the result tables
    #[arg(long, default_value = "results")]
    pub out: PathBuf,
}

#[derive(Args)]
pub struct DemoArgs {
    /// Output directory; recordings go to `<out>/data`
    #[arg(long, default_value = "demo")]
    pub out: PathBuf,

    /// Seed for the simulated recordings
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Length of each ECG recording in seconds
    #[arg(long, default_value_t = 120.0)]
    pub ecg_seconds: f64,

    /// Length of each EDA recording in seconds
    #[arg(long, default_value_t = 300.0)]
    pub eda_seconds: f64,
}
