use anyhow::{Context, Result};
use mabe_sim::simulation::{Registry, RunConfig};
use std::path::Path;

use crate::printing::{print_run_config, print_traits};

pub fn validate_config(config_path: &Path) -> Result<()> {
    println!("🔍 Validating configuration: {}", config_path.display());

    if !config_path.exists() {
        anyhow::bail!("Configuration file does not exist");
    }

    let config = RunConfig::from_file(config_path).context("Failed to load configuration")?;
    println!(
        "✓ Parsed: {} populations, {} organism types, {} modules",
        config.populations.len(),
        config.organisms.len(),
        config.modules.len()
    );
    print_run_config(&config);

    let mabe = config
        .launch(Registry::with_builtins())
        .context("Setup failed")?;
    println!("✓ Trait declarations verified");
    print_traits(&mabe);

    for pop in mabe.world().populations() {
        println!("✓ Population {}: {} organisms injected", pop.name(), pop.num_alive());
    }
    println!("\n✓ Configuration is valid");

    Ok(())
}
