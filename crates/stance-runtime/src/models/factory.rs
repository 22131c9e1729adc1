//! Model factory pattern for dynamic backend registration.
//!
//! Backends register a factory under a kind string; adapters are then
//! created from a [`ModelDescriptor`] without the caller naming a concrete
//! type.
//!
//! ## Usage
//!
//! ```ignore
//! let registry = ModelRegistry::with_defaults();
//! let descriptor = config.model("llama2")?;
//! let mut adapter = registry.create(&descriptor.kind, descriptor)?;
//! adapter.load().await;
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::{ModelAdapter, ModelDescriptor, ModelError};

/// Factory for one backend kind.
pub trait ModelFactory: Send + Sync {
    /// Unique kind identifier, lowercase (e.g. "ollama").
    fn kind(&self) -> &'static str;

    /// Build an unloaded adapter from a descriptor.
    fn create(&self, descriptor: &ModelDescriptor) -> Result<Box<dyn ModelAdapter>, ModelError>;

    /// Kind-specific descriptor checks, without constructing anything.
    fn validate_config(&self, descriptor: &ModelDescriptor) -> Result<(), ModelError>;

    fn description(&self) -> &'static str {
        "Model backend"
    }
}

/// Registry of backend factories keyed by kind.
///
/// Factories sit behind a lock so new kinds can be registered through a
/// shared reference while other threads create adapters.
#[derive(Default)]
pub struct ModelRegistry {
    factories: RwLock<BTreeMap<String, Arc<dyn ModelFactory>>>,
}

impl ModelRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory. A factory with the same kind is replaced.
    pub fn register(&self, factory: Arc<dyn ModelFactory>) {
        let kind = normalize_kind(factory.kind());
        tracing::info!(kind = %kind, "Registered model factory");
        self.factories.write().insert(kind, factory);
    }

    /// Create an adapter for `kind` from a descriptor.
    pub fn create(
        &self,
        kind: &str,
        descriptor: &ModelDescriptor,
    ) -> Result<Box<dyn ModelAdapter>, ModelError> {
        let kind = normalize_kind(kind);
        let factory = self.factory(&kind)?;

        match factory.create(descriptor) {
            Ok(adapter) => {
                tracing::info!(
                    kind = %kind,
                    model = %descriptor.model_name,
                    "Created model adapter"
                );
                Ok(adapter)
            }
            Err(e) => {
                tracing::error!(kind = %kind, error = %e, "Failed to create model");
                Err(ModelError::Construction {
                    kind,
                    message: e.to_string(),
                })
            }
        }
    }

    /// Validate a descriptor for `kind`.
    pub fn validate(&self, kind: &str, descriptor: &ModelDescriptor) -> Result<(), ModelError> {
        let kind = normalize_kind(kind);
        let factory = self.factory(&kind)?;

        if descriptor.model_name.trim().is_empty() {
            return Err(ModelError::InvalidConfig(
                "missing required field 'model_name'".to_string(),
            ));
        }

        factory.validate_config(descriptor)
    }

    /// Boolean form of [`validate`](Self::validate); failures are logged.
    pub fn validate_config(&self, kind: &str, descriptor: &ModelDescriptor) -> bool {
        match self.validate(kind, descriptor) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(kind = %kind, error = %e, "Model config validation failed");
                false
            }
        }
    }

    /// Registered kinds, sorted.
    pub fn available_kinds(&self) -> Vec<String> {
        self.factories.read().keys().cloned().collect()
    }

    pub fn has_kind(&self, kind: &str) -> bool {
        self.factories.read().contains_key(&normalize_kind(kind))
    }

    /// Description of a registered kind.
    pub fn description(&self, kind: &str) -> Option<&'static str> {
        self.factories
            .read()
            .get(&normalize_kind(kind))
            .map(|f| f.description())
    }

    /// Create a registry with all built-in backends registered.
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        #[cfg(feature = "ollama")]
        registry.register(Arc::new(super::OllamaModelFactory));
        registry.register(Arc::new(super::LocalModelFactory::new()));
        registry
    }

    fn factory(&self, kind: &str) -> Result<Arc<dyn ModelFactory>, ModelError> {
        let factories = self.factories.read();
        factories
            .get(kind)
            .cloned()
            .ok_or_else(|| ModelError::UnsupportedKind {
                kind: kind.to_string(),
                available: factories.keys().cloned().collect(),
            })
    }
}

impl std::fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("kinds", &self.available_kinds())
            .finish()
    }
}

fn normalize_kind(kind: &str) -> String {
    kind.trim().to_lowercase()
}
