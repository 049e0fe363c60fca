use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{info, instrument};
use tripwire_config::{ConfigDocument, ConfigError, ConfigParser, ConfigProvider, Revision};
use tripwire_core::ValueMap;
use tripwire_rules::{
    ExecutionContext, LookupError, NodeRegistry, RuleGraph, RuleOutcome, RuleSetOutcome,
    SerializationContext, SerializedNode, run, serialize_node,
};

use crate::builder::EngineBuilder;
use crate::error::EngineError;

/// The currently installed graph and the revision it came from.
#[derive(Debug, Clone, Default)]
struct Loaded {
    graph: Arc<RuleGraph>,
    revision: Option<Revision>,
}

/// Loads rule configuration from a provider and executes rule sets.
///
/// The installed graph is swapped atomically on reload. Every execution
/// works on the snapshot taken when it started, so a reload never affects
/// executions already in flight, and a failed reload leaves the previous
/// graph in place.
pub struct Engine {
    provider: Arc<dyn ConfigProvider>,
    registry: NodeRegistry,
    loaded: RwLock<Loaded>,
    /// Held for a whole save so concurrent saves pick distinct revisions.
    save_lock: Mutex<()>,
}

impl Engine {
    pub(crate) fn new(provider: Arc<dyn ConfigProvider>, registry: NodeRegistry) -> Self {
        Self {
            provider,
            registry,
            loaded: RwLock::new(Loaded::default()),
            save_lock: Mutex::new(()),
        }
    }

    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    /// Load the latest stored revision, if there is one.
    ///
    /// An empty provider is not an error: the engine keeps its empty graph.
    pub async fn init(&self) -> Result<Option<Revision>, EngineError> {
        match self.provider.latest_revision().await? {
            Some(revision) => self.load_config(Some(revision)).await.map(Some),
            None => {
                info!("no configuration stored, starting with an empty rule graph");
                Ok(None)
            }
        }
    }

    /// Load a revision (the latest when `None`) and install it.
    #[instrument(skip(self))]
    pub async fn load_config(&self, revision: Option<Revision>) -> Result<Revision, EngineError> {
        let revision = match revision {
            Some(revision) => revision,
            None => self
                .provider
                .latest_revision()
                .await?
                .ok_or(ConfigError::NoRevisions)?,
        };
        let document = self.provider.load(revision).await?;
        self.load_document(&document)
    }

    /// Parse a document and install it in place of the current graph.
    pub fn load_document(&self, document: &ConfigDocument) -> Result<Revision, EngineError> {
        let graph = ConfigParser::parse(document, &self.registry)?;
        let revision = document.revision;
        info!(
            %revision,
            rules = graph.rules().len(),
            rule_sets = graph.rule_sets().len(),
            "configuration loaded"
        );
        *self.loaded.write() = Loaded {
            graph: Arc::new(graph),
            revision: Some(revision),
        };
        Ok(revision)
    }

    /// Check that a document parses against this engine's nodes, without
    /// installing it.
    pub fn validate_document(&self, document: &ConfigDocument) -> Result<(), EngineError> {
        ConfigParser::parse(document, &self.registry)?;
        Ok(())
    }

    /// Export the installed graph as a new revision, one above the latest
    /// stored revision.
    ///
    /// Saves through the same engine are serialized. Other writers sharing
    /// the provider are not coordinated with.
    #[instrument(skip(self))]
    pub async fn save_config(&self) -> Result<Revision, EngineError> {
        let _saving = self.save_lock.lock().await;
        let graph = self.graph();
        let revision = self
            .provider
            .latest_revision()
            .await?
            .map_or(Revision::new(1), Revision::next);
        let document = ConfigParser::export(revision, &graph);
        self.provider.save(&document).await?;

        let mut loaded = self.loaded.write();
        if Arc::ptr_eq(&loaded.graph, &graph) {
            loaded.revision = Some(revision);
        }
        info!(%revision, "configuration saved");
        Ok(revision)
    }

    /// Execute a rule set against native inputs.
    #[instrument(skip(self, inputs), fields(rule_set.id = %id))]
    pub async fn execute_rule_set(
        &self,
        id: &str,
        inputs: ValueMap,
    ) -> Result<RuleSetOutcome, EngineError> {
        let graph = self.graph();
        let rule_set = graph
            .rule_set(id)
            .cloned()
            .ok_or_else(|| LookupError::RuleSet(id.to_owned()))?;
        let ctx = ExecutionContext::new(graph);
        let result = run(rule_set.as_ref(), inputs, &ctx).await?;
        Ok(result.outputs)
    }

    /// Execute a single rule against native inputs.
    #[instrument(skip(self, inputs), fields(rule.id = %id))]
    pub async fn execute_rule(&self, id: &str, inputs: ValueMap) -> Result<RuleOutcome, EngineError> {
        let graph = self.graph();
        let rule = graph
            .rule(id)
            .cloned()
            .ok_or_else(|| LookupError::Rule(id.to_owned()))?;
        let ctx = ExecutionContext::new(graph);
        let result = run(rule.as_ref(), inputs, &ctx).await?;
        Ok(result.outputs)
    }

    /// Describe one registered node, resolved against `ctx`.
    pub fn export_serialized_node(
        &self,
        node_id: &str,
        ctx: &SerializationContext,
    ) -> Result<SerializedNode, EngineError> {
        let node = self
            .registry
            .get(node_id)
            .ok_or_else(|| EngineError::UnknownNode(node_id.to_owned()))?;
        Ok(serialize_node(node.as_ref(), ctx))
    }

    /// Describe every registered node, sorted by name.
    pub fn export_serialized_nodes(&self, ctx: &SerializationContext) -> Vec<SerializedNode> {
        let mut nodes: Vec<_> = self
            .registry
            .nodes()
            .iter()
            .map(|node| serialize_node(node.as_ref(), ctx))
            .collect();
        nodes.sort_by(|a, b| a.name.cmp(&b.name));
        nodes
    }

    /// Snapshot of the installed graph.
    pub fn graph(&self) -> Arc<RuleGraph> {
        Arc::clone(&self.loaded.read().graph)
    }

    /// Revision of the installed graph, if one was loaded or saved.
    pub fn loaded_revision(&self) -> Option<Revision> {
        self.loaded.read().revision
    }

    pub fn rule_ids(&self) -> Vec<String> {
        self.graph().rules().iter().map(|r| r.id().to_owned()).collect()
    }

    pub fn rule_set_ids(&self) -> Vec<String> {
        self.graph()
            .rule_sets()
            .iter()
            .map(|s| s.id().to_owned())
            .collect()
    }

    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("registry", &self.registry)
            .field("loaded_revision", &self.loaded_revision())
            .finish_non_exhaustive()
    }
}
