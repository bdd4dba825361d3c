use mabe_sim::data::Access;
use mabe_sim::simulation::{ConfigScope, OptionKind, RunConfig, UpdateSummary};
use mabe_sim::Mabe;

pub fn print_run_config(config: &RunConfig) {
    println!("\n📋 Run Configuration");
    if let Some(seed) = config.seed {
        println!("  • Random Seed: {seed} [--seed]");
    } else {
        println!("  • Random Seed: Random [--seed]");
    }
    println!("  • Generations: {} [-g, --generations]", config.generations);

    println!("\n🌍 Populations");
    for pop in &config.populations {
        println!("  • {} (initial size {})", pop.name, pop.size);
    }

    println!("\n🧬 Organism Types");
    for org in &config.organisms {
        println!("  • {} [{}]", org.name, org.type_name);
        for (option, value) in &org.options {
            println!("    - {option} = {value}");
        }
    }

    println!("\n🧩 Modules");
    for module in &config.modules {
        println!("  • {} [{}]", module.name, module.type_name);
        for (option, value) in &module.options {
            println!("    - {option} = {value}");
        }
    }

    if !config.inject.is_empty() {
        println!("\n💉 Injections");
        for inject in &config.inject {
            println!(
                "  • {} × {} into {}",
                inject.count, inject.organism, inject.population
            );
        }
    }
    println!();
}

pub fn print_traits(mabe: &Mabe) {
    println!("\n🔗 Traits");
    for info in mabe.traits().iter() {
        let trait_type = info
            .declarations()
            .first()
            .map(|decl| decl.trait_type().to_string())
            .unwrap_or_default();
        let writer = info
            .owner()
            .map(|decl| format!("{} by {}", decl.access(), decl.module()))
            .unwrap_or_else(|| {
                let shared = info.modules_with(Access::Shared);
                format!("shared by {}", shared.join(", "))
            });
        let readers = info.modules_with(Access::Required);
        if readers.is_empty() {
            println!("  • {} <{trait_type}>: {writer}", info.name());
        } else {
            println!(
                "  • {} <{trait_type}>: {writer}; read by {}",
                info.name(),
                readers.join(", ")
            );
        }
    }
    println!();
}

pub fn print_options(scope: &ConfigScope) {
    for option in scope.options() {
        let marker = match option.kind() {
            OptionKind::Var => "",
            OptionKind::Population => " (population)",
        };
        println!(
            "    - {} = {}{marker}: {}",
            option.name(),
            option.default_value(),
            option.desc()
        );
    }
    for function in scope.functions() {
        println!("    - {}(): {}", function.name(), function.desc());
    }
}

pub fn print_summary(summary: &UpdateSummary, mabe: &Mabe) {
    println!("\n📈 Results");
    println!("  • Generations run: {}", summary.generations());
    println!("  • Births: {}", summary.births());
    if summary.cancelled {
        println!("  • Stopped early: cancelled");
    }
    if let Some(last) = summary.last() {
        for (module, best) in &last.best_scores {
            let first = summary.best_scores(module).first().copied().unwrap_or(0.0);
            println!("  • Best {module}: {best:.6} (first generation: {first:.6})");
        }
    }
    for pop in mabe.world().populations() {
        println!("  • Population {}: {} alive", pop.name(), pop.num_alive());
    }
    let errors = mabe.world().eval_error_count();
    if errors > 0 {
        println!("  • ⚠️  Evaluation errors: {errors}");
    }
}
