//! Persistence contract for finished modules.

use crate::module::ExtensionModule;
use crate::{ModforgeError, ModforgeResult};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Host-side storage for extension modules.
///
/// The agent engine never calls this directly; only the `create_module` tool
/// and the caller persist modules.
#[async_trait]
pub trait ModuleStore: Send + Sync {
    /// Persists a module and returns the stored copy.
    async fn add_module(&self, module: ExtensionModule) -> ModforgeResult<ExtensionModule>;

    /// Looks up a module by id.
    async fn get_module(&self, id: &str) -> ModforgeResult<Option<ExtensionModule>>;

    /// Lists every stored module, oldest first.
    async fn list_modules(&self) -> ModforgeResult<Vec<ExtensionModule>>;
}

/// In-memory module store for tests and short-lived runs.
pub struct InMemoryModuleStore {
    modules: RwLock<HashMap<String, ExtensionModule>>,
}

impl InMemoryModuleStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            modules: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored modules.
    pub async fn len(&self) -> usize {
        self.modules.read().await.len()
    }

    /// True when nothing has been stored.
    pub async fn is_empty(&self) -> bool {
        self.modules.read().await.is_empty()
    }
}

impl Default for InMemoryModuleStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModuleStore for InMemoryModuleStore {
    async fn add_module(&self, module: ExtensionModule) -> ModforgeResult<ExtensionModule> {
        if module.name.trim().is_empty() {
            return Err(ModforgeError::Store("module name must not be empty".into()));
        }
        let mut modules = self.modules.write().await;
        if modules.contains_key(&module.id) {
            return Err(ModforgeError::Store(format!(
                "module '{}' already exists",
                module.id
            )));
        }
        modules.insert(module.id.clone(), module.clone());
        tracing::debug!(module_id = %module.id, name = %module.name, "Module stored");
        Ok(module)
    }

    async fn get_module(&self, id: &str) -> ModforgeResult<Option<ExtensionModule>> {
        Ok(self.modules.read().await.get(id).cloned())
    }

    async fn list_modules(&self) -> ModforgeResult<Vec<ExtensionModule>> {
        let mut all: Vec<_> = self.modules.read().await.values().cloned().collect();
        all.sort_by_key(|m| m.created_at);
        Ok(all)
    }
}
