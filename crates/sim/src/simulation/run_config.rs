//! JSON description of a complete run.

use super::{Mabe, Registry};
use crate::errors::{MabeError, ResourceError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

fn default_generations() -> usize {
    100
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PopulationConfig {
    pub name: String,
    #[serde(default)]
    pub size: usize,
}

/// An organism manager or module: registered type, instance name and
/// option overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntityConfig {
    #[serde(rename = "type")]
    pub type_name: String,
    pub name: String,
    #[serde(default)]
    pub options: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InjectConfig {
    pub population: String,
    pub organism: String,
    pub count: usize,
}

/// Everything needed to build and start a run.
///
/// ```json
/// {
///   "seed": 1,
///   "generations": 50,
///   "populations": [{ "name": "main_pop", "size": 0 }],
///   "organisms": [{ "type": "BitsOrg", "name": "bits_org", "options": { "init_length": 30 } }],
///   "modules": [
///     { "type": "EvalNK", "name": "eval_nk", "options": { "N": 30, "K": 2 } },
///     { "type": "SelectElite", "name": "elite", "options": { "top_k": 1, "copies_per_winner": 100 } }
///   ],
///   "inject": [{ "population": "main_pop", "organism": "bits_org", "count": 100 }]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Seed for the run; drawn from entropy when absent.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default = "default_generations")]
    pub generations: usize,
    pub populations: Vec<PopulationConfig>,
    #[serde(default)]
    pub organisms: Vec<EntityConfig>,
    #[serde(default)]
    pub modules: Vec<EntityConfig>,
    #[serde(default)]
    pub inject: Vec<InjectConfig>,
}

impl RunConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ResourceError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|err| ResourceError::io(path, err))?;
        serde_json::from_str(&text).map_err(|err| ResourceError::Parse {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })
    }

    /// Create the controller and every entity, and record option overrides.
    /// Setup has not run yet.
    pub fn build(&self, registry: Registry) -> Result<Mabe, MabeError> {
        let mabe = match self.seed {
            Some(seed) => Mabe::new(seed),
            None => Mabe::from_entropy(),
        };
        let mut mabe = mabe.with_registry(registry);
        for pop in &self.populations {
            mabe.add_population(&pop.name, pop.size)?;
        }
        for org in &self.organisms {
            mabe.add_organism_by_type(&org.type_name, &org.name)?;
        }
        for module in &self.modules {
            mabe.add_module_by_type(&module.type_name, &module.name)?;
        }
        for entity in self.organisms.iter().chain(&self.modules) {
            for (option, value) in &entity.options {
                mabe.set_option(&entity.name, option, value.clone())?;
            }
        }
        Ok(mabe)
    }

    /// [`build`](Self::build), run setup and perform the injections.
    pub fn launch(&self, registry: Registry) -> Result<Mabe, MabeError> {
        let mut mabe = self.build(registry)?;
        mabe.setup()?;
        for inject in &self.inject {
            mabe.inject(&inject.population, &inject.organism, inject.count)?;
        }
        Ok(mabe)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SetupError;
    use crate::modules::EvalNk;
    use serde_json::json;
    use tempfile::tempdir;

    fn config() -> RunConfig {
        serde_json::from_value(json!({
            "seed": 9,
            "generations": 3,
            "populations": [{ "name": "main_pop" }],
            "organisms": [{ "type": "BitsOrg", "name": "bits_org", "options": { "init_length": 12 } }],
            "modules": [
                { "type": "EvalNK", "name": "eval_nk", "options": { "N": 12, "K": 1 } },
                { "type": "SelectElite", "name": "elite", "options": { "copies_per_winner": 5 } }
            ],
            "inject": [{ "population": "main_pop", "organism": "bits_org", "count": 5 }]
        }))
        .unwrap()
    }

    #[test]
    fn test_defaults() {
        let config: RunConfig = serde_json::from_value(json!({ "populations": [] })).unwrap();
        assert_eq!(config.generations, 100);
        assert_eq!(config.seed, None);
        assert!(config.modules.is_empty());
    }

    #[test]
    fn test_launch_applies_options_and_injects() {
        let mut mabe = config().launch(Registry::with_builtins()).unwrap();
        assert_eq!(mabe.seed(), 9);
        assert_eq!(mabe.module::<EvalNk>("eval_nk").unwrap().n(), 12);
        assert_eq!(mabe.world().total_alive(), 5);
        let summary = mabe.update(3).unwrap();
        assert_eq!(summary.births(), 15);
    }

    #[test]
    fn test_unknown_module_type() {
        let mut config = config();
        config.modules[0].type_name = "EvalMystery".into();
        assert!(matches!(
            config.build(Registry::with_builtins()),
            Err(MabeError::Setup(SetupError::UnknownModule(name))) if name == "EvalMystery"
        ));
    }

    #[test]
    fn test_from_file_reports_parse_errors() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.json");
        std::fs::write(&path, r#"{ "populations": [], "bogus": 1 }"#).unwrap();
        assert!(matches!(RunConfig::from_file(&path), Err(ResourceError::Parse { .. })));
        assert!(matches!(
            RunConfig::from_file(dir.path().join("missing.json")),
            Err(ResourceError::Io { .. })
        ));
    }
}
