use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::Backend;

/// Process-wide mapping from provider name to live backend instance.
/// Populated at startup from the client config and grown at runtime when the
/// user links a new provider. Entries are never removed.
#[derive(Default)]
pub struct BackendRegistry {
    inner: RwLock<HashMap<&'static str, Arc<dyn Backend>>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a backend, overwriting any previous instance with the same name.
    pub async fn register(&self, backend: Arc<dyn Backend>) {
        let name = backend.name();
        tracing::info!(backend = name, "Registering backend");
        self.inner.write().await.insert(name, backend);
    }

    pub async fn get(&self, name: &str) -> Option<Arc<dyn Backend>> {
        self.inner.read().await.get(name).cloned()
    }

    pub async fn contains(&self, name: &str) -> bool {
        self.inner.read().await.contains_key(name)
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    /// Snapshot of every registered backend, used to drive the combined link
    /// page over all enabled providers at once.
    pub async fn all(&self) -> Vec<Arc<dyn Backend>> {
        self.inner.read().await.values().cloned().collect()
    }
}
