mod clustering;
mod config;
mod error;
mod generator;
mod graph;
#[cfg(feature = "modularity")]
mod modularity;
mod partition;
mod pipeline;
mod population;
mod report;
mod rng;
mod simulation;
mod stats;
mod utils;

use crate::config::Config;
use crate::pipeline::Pipeline;
use crate::report::Summary;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(version, about)]
struct CLI {
    /// TOML configuration file.
    #[arg(long)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Simulate scores, build the social graph and partition it.
    Run {
        /// Override the seed of the configuration file.
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Load and validate the configuration only.
    Check,
}

fn main() {
    env_logger::Builder::new()
        .format_timestamp_millis()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    if let Err(error) = run_cli() {
        log::error!("{error:#?}");
        std::process::exit(1);
    }
}

fn run_cli() -> Result<()> {
    let args = CLI::parse();
    log::info!("{args:#?}");

    let mut cfg = Config::from_file(&args.config).context("failed to construct cfg")?;

    match args.command {
        Command::Run { seed } => {
            if let Some(seed) = seed {
                cfg.seed = seed;
            }
            log::info!("{cfg:#?}");

            let pipeline = Pipeline::new(cfg).context("failed to construct pipeline")?;
            let outcome = pipeline.run().context("failed to run pipeline")?;

            let summary = Summary::new(&outcome);
            log::info!("{summary:#?}");
        }
        Command::Check => {
            log::info!("{cfg:#?}");
            log::info!("config is valid");
        }
    }

    Ok(())
}
