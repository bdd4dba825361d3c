use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use mabe_sim::simulation::{PopulationSnapshot, Registry, RunConfig, UpdateSummary};
use mabe_sim::Mabe;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::printing::{print_run_config, print_summary};

/// Command-line overrides for a run.
#[derive(Debug, Default)]
pub struct RunOptions {
    pub seed: Option<u64>,
    pub generations: Option<usize>,
    pub snapshot: Option<PathBuf>,
    pub snapshot_pop: Option<String>,
    pub progress: bool,
}

pub fn run_experiment(config_path: &Path, options: &RunOptions) -> Result<()> {
    println!("🧬 MABE - Running Experiment");
    println!("============================================");

    let mut config = RunConfig::from_file(config_path)
        .with_context(|| format!("Failed to load configuration {}", config_path.display()))?;
    if let Some(seed) = options.seed {
        config.seed = Some(seed);
    }
    if let Some(generations) = options.generations {
        config.generations = generations;
    }
    print_run_config(&config);

    let mut mabe = config
        .launch(Registry::with_builtins())
        .context("Failed to set up the run")?;
    info!(seed = mabe.seed(), "run ready");
    println!("✓ Setup complete (seed {})", mabe.seed());
    println!("Running {} generations...", config.generations);

    let summary = evolve(&mut mabe, config.generations, options.progress)?;

    println!("\n✓ Run complete!");
    print_summary(&summary, &mabe);

    if let Some(path) = &options.snapshot {
        write_snapshot(&mabe, options.snapshot_pop.as_deref(), path)?;
        println!("\n💾 Snapshot written to {}", path.display());
    }

    Ok(())
}

/// Run `generations` updates, one at a time so the progress bar can tick.
fn evolve(mabe: &mut Mabe, generations: usize, show_progress: bool) -> Result<UpdateSummary> {
    let pb = if show_progress {
        let pb = ProgressBar::new(generations as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
                )
                .context("Invalid progress bar template")?
                .progress_chars("#>-"),
        );
        Some(pb)
    } else {
        None
    };

    let mut summary = UpdateSummary::default();
    for _ in 0..generations {
        let step = mabe
            .update(1)
            .with_context(|| format!("Generation {} failed", mabe.world().generation()))?;
        let cancelled = step.cancelled;
        summary.reports.extend(step.reports);
        if let (Some(pb), Some(report)) = (&pb, summary.last()) {
            if let Some((module, best)) = report.best_scores.first() {
                pb.set_message(format!("{module}: {best:.4}"));
            }
            pb.inc(1);
        }
        if cancelled {
            summary.cancelled = true;
            break;
        }
    }

    if let Some(pb) = pb {
        pb.finish_with_message("Done");
    }
    Ok(summary)
}

fn write_snapshot(mabe: &Mabe, pop: Option<&str>, path: &Path) -> Result<()> {
    let world = mabe.world();
    let pop_id = match pop {
        Some(name) => world
            .population_id(name)
            .with_context(|| format!("Unknown population '{name}'"))?,
        None => 0,
    };
    let population = world.population(pop_id).context("No population to snapshot")?;
    let snapshot = PopulationSnapshot::capture(population, world.generation())
        .context("Failed to capture population")?;
    snapshot
        .write_json(path)
        .with_context(|| format!("Failed to write snapshot {}", path.display()))?;
    Ok(())
}
