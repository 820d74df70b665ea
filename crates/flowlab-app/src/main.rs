//! FlowLab - Microfluidic video analysis
//!
//! Batch CLI entry point: deflection and velocity pipelines driven by
//! JSON run configurations.

mod config;
mod pipeline;

use anyhow::Result;
use clap::{Parser, Subcommand};
use config::{DeflectionConfig, VelocityConfig};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "flowlab", version, about = "Microfluidic video analysis pipelines")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Membrane gap measurement aligned with the electrical log
    Deflection {
        /// JSON run configuration
        config: PathBuf,
    },
    /// Tracer bead velocity and peak summary
    Velocity {
        /// JSON run configuration
        config: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("FlowLab starting...");

    // Initialize media subsystem
    flowlab_media::init();

    match cli.command {
        Command::Deflection { config } => {
            let config = DeflectionConfig::load(&config)?;
            pipeline::run_deflection(&config)?;
        }
        Command::Velocity { config } => {
            let config = VelocityConfig::load(&config)?;
            pipeline::run_velocity(&config)?;
        }
    }

    info!("Done");
    Ok(())
}
