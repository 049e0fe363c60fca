use std::sync::Arc;

use tripwire_config::ConfigProvider;
use tripwire_rules::{NodeRef, NodeRegistry};

use crate::engine::Engine;
use crate::error::EngineError;

/// Fluent builder for constructing an [`Engine`].
///
/// A [`ConfigProvider`] must be supplied. Built-in nodes are registered
/// unless disabled; custom nodes are registered after them.
pub struct EngineBuilder {
    provider: Option<Arc<dyn ConfigProvider>>,
    builtins: bool,
    nodes: Vec<NodeRef>,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self {
            provider: None,
            builtins: true,
            nodes: Vec::new(),
        }
    }

    /// Set the configuration provider.
    #[must_use]
    pub fn provider(mut self, provider: Arc<dyn ConfigProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Register a custom node.
    #[must_use]
    pub fn node(mut self, node: NodeRef) -> Self {
        self.nodes.push(node);
        self
    }

    /// Whether to register the built-in nodes (default `true`).
    #[must_use]
    pub fn builtins(mut self, enabled: bool) -> Self {
        self.builtins = enabled;
        self
    }

    /// Consume the builder and produce an [`Engine`].
    ///
    /// The engine starts with an empty rule graph; call
    /// [`Engine::init`] or [`Engine::load_config`] to load one.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Configuration`] if no provider was set, and
    /// [`EngineError::Construction`] if two nodes share an id.
    pub fn build(self) -> Result<Engine, EngineError> {
        let provider = self
            .provider
            .ok_or_else(|| EngineError::Configuration("config provider is required".into()))?;

        let mut registry = if self.builtins {
            NodeRegistry::with_builtins()
        } else {
            NodeRegistry::new()
        };
        for node in self.nodes {
            registry.register(node)?;
        }

        Ok(Engine::new(provider, registry))
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
