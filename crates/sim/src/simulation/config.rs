//! Binding between configuration values and module fields.
//!
//! During `setup_config` every module and organism manager links its
//! configurable fields into a [`ConfigScope`]. Linking records the field's
//! current value as the default and stores a setter; the control object later
//! feeds front-end values (for example from a JSON run file) through those
//! setters before module setup begins.

use super::collection::resolve_population;
use super::{Population, World};
use crate::errors::{MabeError, SetupError};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::any::Any;
use std::fmt;

type Setter = Box<dyn Fn(&mut dyn Any, &Value, &[Population]) -> Result<(), String> + Send + Sync>;
type Callable =
    Box<dyn Fn(&mut dyn Any, &mut World, &[Value]) -> Result<Value, MabeError> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    Var,
    Population,
}

/// A linked configuration option.
pub struct ConfigOption {
    name: String,
    desc: String,
    default: Value,
    kind: OptionKind,
    setter: Setter,
}

impl ConfigOption {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn desc(&self) -> &str {
        &self.desc
    }

    /// Value the field held when it was linked.
    pub fn default_value(&self) -> &Value {
        &self.default
    }

    pub fn kind(&self) -> OptionKind {
        self.kind
    }
}

impl fmt::Debug for ConfigOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigOption")
            .field("name", &self.name)
            .field("default", &self.default)
            .field("kind", &self.kind)
            .finish()
    }
}

/// A function a module exposes to the configuration front-end.
pub struct MemberFunction {
    name: String,
    desc: String,
    call: Callable,
}

impl MemberFunction {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn desc(&self) -> &str {
        &self.desc
    }
}

impl fmt::Debug for MemberFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberFunction").field("name", &self.name).finish()
    }
}

/// Options and member functions of one module or organism manager.
#[derive(Debug)]
pub struct ConfigScope {
    owner: String,
    options: IndexMap<String, ConfigOption>,
    functions: IndexMap<String, MemberFunction>,
}

impl ConfigScope {
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            options: IndexMap::new(),
            functions: IndexMap::new(),
        }
    }

    /// Name of the module or manager this scope configures.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Link field `accessor(target)` as option `name`.
    pub fn link_var<M, T>(&mut self, target: &mut M, name: &str, desc: &str, accessor: fn(&mut M) -> &mut T)
    where
        M: Any,
        T: Serialize + DeserializeOwned + 'static,
    {
        let default = serde_json::to_value(&*accessor(target)).unwrap_or(Value::Null);
        let setter: Setter = Box::new(move |target, value, _| {
            let target = target
                .downcast_mut::<M>()
                .ok_or_else(|| "option bound to the wrong object".to_string())?;
            *accessor(target) = serde_json::from_value(value.clone()).map_err(|err| err.to_string())?;
            Ok(())
        });
        self.insert_option(name, desc, default, OptionKind::Var, setter);
    }

    /// Link a population-id field. Values may name the population or give its id.
    pub fn link_pop<M: Any>(&mut self, target: &mut M, name: &str, desc: &str, accessor: fn(&mut M) -> &mut usize) {
        let default = Value::from(*accessor(target));
        let setter: Setter = Box::new(move |target, value, populations| {
            let target = target
                .downcast_mut::<M>()
                .ok_or_else(|| "option bound to the wrong object".to_string())?;
            let id = match value {
                Value::String(pop_name) => resolve_population(pop_name, populations)
                    .ok_or_else(|| format!("unknown population '{pop_name}'"))?,
                Value::Number(n) => n
                    .as_u64()
                    .map(|n| n as usize)
                    .filter(|&n| n < populations.len())
                    .ok_or_else(|| format!("no population with id {n}"))?,
                other => return Err(format!("expected a population name or id, got {other}")),
            };
            *accessor(target) = id;
            Ok(())
        });
        self.insert_option(name, desc, default, OptionKind::Population, setter);
    }

    /// Expose `call` to the configuration front-end as `name`.
    pub fn add_member_function<M: Any>(
        &mut self,
        name: &str,
        desc: &str,
        call: fn(&mut M, &mut World, &[Value]) -> Result<Value, MabeError>,
    ) {
        let owner = self.owner.clone();
        let function_name = name.to_string();
        let call: Callable = Box::new(move |target, world, args| {
            let target = target.downcast_mut::<M>().ok_or_else(|| SetupError::UnknownFunction {
                module: owner.clone(),
                function: function_name.clone(),
            })?;
            call(target, world, args)
        });
        self.functions.insert(
            name.to_string(),
            MemberFunction {
                name: name.to_string(),
                desc: desc.to_string(),
                call,
            },
        );
    }

    fn insert_option(&mut self, name: &str, desc: &str, default: Value, kind: OptionKind, setter: Setter) {
        self.options.insert(
            name.to_string(),
            ConfigOption {
                name: name.to_string(),
                desc: desc.to_string(),
                default,
                kind,
                setter,
            },
        );
    }

    pub fn options(&self) -> impl Iterator<Item = &ConfigOption> {
        self.options.values()
    }

    pub fn option(&self, name: &str) -> Option<&ConfigOption> {
        self.options.get(name)
    }

    pub fn functions(&self) -> impl Iterator<Item = &MemberFunction> {
        self.functions.values()
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Store `value` into the field linked as `name`.
    pub fn apply(
        &self,
        target: &mut dyn Any,
        name: &str,
        value: &Value,
        populations: &[Population],
    ) -> Result<(), SetupError> {
        let option = self.options.get(name).ok_or_else(|| SetupError::UnknownOption {
            module: self.owner.clone(),
            option: name.to_string(),
        })?;
        (option.setter)(target, value, populations).map_err(|reason| SetupError::InvalidOption {
            module: self.owner.clone(),
            option: name.to_string(),
            reason,
        })
    }

    pub fn call(
        &self,
        target: &mut dyn Any,
        name: &str,
        world: &mut World,
        args: &[Value],
    ) -> Result<Value, MabeError> {
        let function = self.functions.get(name).ok_or_else(|| SetupError::UnknownFunction {
            module: self.owner.clone(),
            function: name.to_string(),
        })?;
        (function.call)(target, world, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::Random;
    use serde_json::json;

    #[derive(Debug, Default)]
    struct Settings {
        n: usize,
        rate: f64,
        label: String,
        pop: usize,
        calls: usize,
    }

    fn scope(settings: &mut Settings) -> ConfigScope {
        let mut scope = ConfigScope::new("settings");
        scope.link_var(settings, "N", "count", |s| &mut s.n);
        scope.link_var(settings, "rate", "a rate", |s| &mut s.rate);
        scope.link_var(settings, "label", "a label", |s| &mut s.label);
        scope.link_pop(settings, "pop", "a population", |s| &mut s.pop);
        scope.add_member_function::<Settings>("BUMP", "count calls", |s, _, args| {
            s.calls += args.len().max(1);
            Ok(Value::from(s.calls))
        });
        scope
    }

    fn populations() -> Vec<Population> {
        vec![Population::new(0, "main_pop", 1), Population::new(1, "sub_pop", 1)]
    }

    #[test]
    fn test_defaults_recorded_at_link_time() {
        let mut settings = Settings {
            n: 7,
            ..Settings::default()
        };
        let scope = scope(&mut settings);
        assert_eq!(scope.option("N").unwrap().default_value(), &json!(7));
        assert_eq!(scope.option("pop").unwrap().kind(), OptionKind::Population);
        let names: Vec<_> = scope.options().map(ConfigOption::name).collect();
        assert_eq!(names, ["N", "rate", "label", "pop"]);
    }

    #[test]
    fn test_apply_values() {
        let mut settings = Settings::default();
        let scope = scope(&mut settings);
        let pops = populations();
        scope.apply(&mut settings, "N", &json!(30), &pops).unwrap();
        scope.apply(&mut settings, "rate", &json!(0.25), &pops).unwrap();
        scope.apply(&mut settings, "label", &json!("x"), &pops).unwrap();
        scope.apply(&mut settings, "pop", &json!("sub_pop"), &pops).unwrap();
        assert_eq!(settings.n, 30);
        assert_eq!(settings.rate, 0.25);
        assert_eq!(settings.label, "x");
        assert_eq!(settings.pop, 1);
        scope.apply(&mut settings, "pop", &json!(0), &pops).unwrap();
        assert_eq!(settings.pop, 0);
    }

    #[test]
    fn test_apply_errors() {
        let mut settings = Settings::default();
        let scope = scope(&mut settings);
        let pops = populations();
        assert_eq!(
            scope.apply(&mut settings, "missing", &json!(1), &pops),
            Err(SetupError::UnknownOption {
                module: "settings".into(),
                option: "missing".into()
            })
        );
        assert!(matches!(
            scope.apply(&mut settings, "N", &json!("ten"), &pops),
            Err(SetupError::InvalidOption { .. })
        ));
        assert!(matches!(
            scope.apply(&mut settings, "pop", &json!("nowhere"), &pops),
            Err(SetupError::InvalidOption { .. })
        ));
        assert!(matches!(
            scope.apply(&mut settings, "pop", &json!(5), &pops),
            Err(SetupError::InvalidOption { .. })
        ));
    }

    #[test]
    fn test_member_function_call() {
        let mut settings = Settings::default();
        let scope = scope(&mut settings);
        let mut world = World::new(Random::new(0));
        let result = scope
            .call(&mut settings, "BUMP", &mut world, &[json!(1), json!(2)])
            .unwrap();
        assert_eq!(result, json!(2));
        assert!(matches!(
            scope.call(&mut settings, "NOPE", &mut world, &[]),
            Err(MabeError::Setup(SetupError::UnknownFunction { .. }))
        ));
    }
}
