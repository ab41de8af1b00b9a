use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use parking_lot::RwLock;

use module_core::loader::load_definitions_dir;

use crate::task::Module;

/// Per-process lookup of ready modules by name. Populated once at startup,
/// read-only afterwards.
#[derive(Default)]
pub struct ModuleRegistry {
    modules: RwLock<HashMap<String, Arc<Module>>>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum ResolveError {
    ModuleNotFound,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from every definition file under `dir`.
    pub fn from_definitions_dir(dir: &Path) -> Result<Self> {
        let registry = Self::new();
        for definition in load_definitions_dir(dir)? {
            let name = definition.name.clone();
            let module =
                Module::new(definition).with_context(|| format!("failed to build module `{name}`"))?;
            registry.register(module);
        }
        Ok(registry)
    }

    /// The process-wide registry. Register modules into it at startup;
    /// tasks resolve from it afterwards.
    pub fn global() -> &'static ModuleRegistry {
        static GLOBAL: OnceCell<ModuleRegistry> = OnceCell::new();
        GLOBAL.get_or_init(ModuleRegistry::new)
    }

    /// Register a module under its definition name. A later registration
    /// under the same name replaces the earlier one.
    pub fn register(&self, module: Module) -> Arc<Module> {
        let module = Arc::new(module);
        self.modules
            .write()
            .insert(module.name().to_string(), Arc::clone(&module));
        module
    }

    pub fn resolve(&self, name: &str) -> Result<Arc<Module>, ResolveError> {
        self.modules
            .read()
            .get(name)
            .cloned()
            .ok_or(ResolveError::ModuleNotFound)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.modules.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.modules.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::{IndexMap, indexmap};
    use module_core::{ModuleDefinition, ParamSpec, ParamType, Verb};

    fn definition(name: &str) -> ModuleDefinition {
        ModuleDefinition {
            family: "sites".to_string(),
            name: name.to_string(),
            operations: indexmap! { Verb::Get => vec!["get_site".to_string()] },
            parameters: indexmap! {
                "get_site".to_string() => vec![ParamSpec {
                    name: "site_id".to_string(),
                    sdk_name: None,
                    param_type: ParamType::String,
                    required: true,
                    array_type: None,
                    schema: Vec::new(),
                    artificial: false,
                }],
            },
            responses: IndexMap::new(),
            idempotent: false,
        }
    }

    #[test]
    fn registers_and_resolves_by_name() {
        let registry = ModuleRegistry::new();
        assert!(registry.is_empty());
        registry.register(Module::new(definition("site_info")).unwrap());
        let module = registry.resolve("site_info").unwrap();
        assert_eq!(module.name(), "site_info");
        assert_eq!(registry.names(), ["site_info"]);
        assert_eq!(
            registry.resolve("missing").unwrap_err(),
            ResolveError::ModuleNotFound
        );
    }

    #[test]
    fn global_registry_is_process_wide() {
        ModuleRegistry::global().register(Module::new(definition("global_site_info")).unwrap());
        assert!(ModuleRegistry::global().resolve("global_site_info").is_ok());
    }

    #[test]
    fn later_registration_replaces_earlier() {
        let registry = ModuleRegistry::new();
        registry.register(Module::new(definition("site_info")).unwrap());
        let mut replacement = definition("site_info");
        replacement.family = "site_design".to_string();
        registry.register(Module::new(replacement).unwrap());
        assert_eq!(registry.len(), 1);
        let module = registry.resolve("site_info").unwrap();
        assert_eq!(module.definition().family, "site_design");
    }
}
