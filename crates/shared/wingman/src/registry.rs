use crate::error::WingmanError;
use crate::module::Module;
use fxhash::FxHashMap;
use mora_domain::ModuleCapabilities;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone)]
struct Registered {
    module: Arc<dyn Module>,
    capabilities: ModuleCapabilities,
}

/// The set of modules a host drives, in registration order.
#[derive(Debug, Default, Clone)]
pub struct ModuleRegistry {
    modules: Vec<Registered>,
    by_name: FxHashMap<String, usize>,
}

impl ModuleRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a module and records its capabilities.
    ///
    /// # Errors
    /// Returns [`WingmanError::Registration`] when the name is empty or taken, or when the
    /// module advertises `FUNCTIONS` without providing them.
    pub fn register(&mut self, module: Arc<dyn Module>) -> Result<(), WingmanError> {
        let name = module.name().to_owned();
        if name.trim().is_empty() {
            return Err(registration("module name cannot be empty".into()));
        }
        if self.by_name.contains_key(&name) {
            return Err(registration(format!("module `{name}` is already registered")));
        }

        let capabilities = module.capabilities();
        if capabilities.contains(ModuleCapabilities::FUNCTIONS)
            && module.as_function_provider().is_none()
        {
            return Err(registration(format!(
                "module `{name}` advertises functions but provides none"
            )));
        }

        debug!(module = %name, capabilities = ?capabilities, "Module registered");
        self.by_name.insert(name, self.modules.len());
        self.modules.push(Registered { module, capabilities });
        Ok(())
    }

    /// Chainable form of [`ModuleRegistry::register`].
    ///
    /// # Errors
    /// See [`ModuleRegistry::register`].
    pub fn with(mut self, module: Arc<dyn Module>) -> Result<Self, WingmanError> {
        self.register(module)?;
        Ok(self)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Module>> {
        self.by_name.get(name).map(|&i| &self.modules[i].module)
    }

    #[must_use]
    pub fn capabilities(&self, name: &str) -> Option<ModuleCapabilities> {
        self.by_name.get(name).map(|&i| self.modules[i].capabilities)
    }

    /// Modules whose recorded capabilities include `capability`.
    pub fn with_capability(
        &self,
        capability: ModuleCapabilities,
    ) -> impl Iterator<Item = &Arc<dyn Module>> {
        self.modules
            .iter()
            .filter(move |r| r.capabilities.contains(capability))
            .map(|r| &r.module)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

fn registration(message: String) -> WingmanError {
    WingmanError::Registration { message: message.into(), context: None }
}
