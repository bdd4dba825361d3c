mod commands;
mod printing;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use commands::{list, run, validate};

/// MABE: Modular Agent-Based Evolver
///
/// Builds a run from a JSON configuration (populations, organism types and
/// modules), verifies every trait declaration, and evolves the populations
/// generation by generation.
#[derive(Parser, Debug)]
#[command(name = "mabe")]
#[command(author, version, about = "Runs modular agent-based evolution experiments", long_about = None)]
struct Cli {
    /// Number of threads to use for parallel evaluation
    ///
    /// If not specified, defaults to the number of logical CPUs.
    #[arg(short = 't', long, global = true)]
    threads: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run an experiment.
    ///
    /// Sets up every module, injects the initial organisms and runs the
    /// configured number of generations.
    Run {
        /// Run configuration (JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Override random seed (default: use configured seed)
        #[arg(long)]
        seed: Option<u64>,

        /// Override number of generations (default: use configured value)
        #[arg(short, long)]
        generations: Option<usize>,

        /// Write a snapshot of the final population to this file
        #[arg(long)]
        snapshot: Option<PathBuf>,

        /// Population to snapshot (name or id; default: the first one)
        #[arg(long, requires = "snapshot")]
        snapshot_pop: Option<String>,

        /// Show progress bar
        #[arg(long)]
        progress: bool,
    },

    /// Validate a configuration without running it.
    ///
    /// Performs the full setup (options, trait verification, layout) and
    /// prints the resulting trait table.
    Validate {
        /// Run configuration (JSON)
        #[arg(short, long)]
        config: PathBuf,
    },

    /// List the available organism and module types with their options.
    List,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()?;
    }

    match cli.command {
        Commands::Run {
            config,
            seed,
            generations,
            snapshot,
            snapshot_pop,
            progress,
        } => {
            let options = run::RunOptions {
                seed,
                generations,
                snapshot,
                snapshot_pop,
                progress,
            };
            run::run_experiment(&config, &options)?;
        }
        Commands::Validate { config } => {
            validate::validate_config(&config)?;
        }
        Commands::List => {
            list::list_types();
        }
    }

    Ok(())
}
