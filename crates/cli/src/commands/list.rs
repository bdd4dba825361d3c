use mabe_sim::simulation::{ConfigScope, Registry};

use crate::printing::print_options;

pub fn list_types() {
    let registry = Registry::with_builtins();

    println!("\n🧬 Organism Types");
    println!("{}", "=".repeat(50));
    for entry in registry.organism_types() {
        println!("  • {}: {}", entry.name(), entry.desc());
        if let Ok(manager) = registry.make_manager(entry.name(), entry.name()) {
            let mut scope = ConfigScope::new(entry.name());
            manager.get().setup_config(&mut scope);
            print_options(&scope);
        }
    }

    println!("\n🧩 Module Types");
    println!("{}", "=".repeat(50));
    for entry in registry.module_types() {
        println!("  • {}: {}", entry.name(), entry.desc());
        if let Ok(mut module) = registry.make_module(entry.name(), entry.name()) {
            let mut scope = ConfigScope::new(entry.name());
            module.setup_config(&mut scope);
            print_options(&scope);
        }
    }

    println!("\n💡 Use 'mabe validate -c <config.json>' to check a configuration");
}
