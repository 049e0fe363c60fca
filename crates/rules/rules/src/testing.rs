//! Nodes and helpers shared by the unit tests of this crate.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tripwire_core::{Value, ValueMap, wrapped};

use crate::error::NodeError;
use crate::node::{Node, NodeContext, PortSpec};

pub fn map(pairs: &[(&str, Value)]) -> ValueMap {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), v.clone()))
        .collect()
}

/// Always fails.
pub struct FailingNode;

#[async_trait]
impl Node for FailingNode {
    fn id(&self) -> &str {
        "fail"
    }

    fn name(&self) -> &str {
        "Fail"
    }

    fn inputs(&self, _ctx: &NodeContext<'_>) -> Vec<PortSpec> {
        Vec::new()
    }

    fn outputs(&self, _ctx: &NodeContext<'_>) -> Vec<PortSpec> {
        vec![PortSpec::new("result", "Result", wrapped::boolean())]
    }

    async fn execute(&self, _inputs: ValueMap, _ctx: &NodeContext<'_>) -> Result<ValueMap, NodeError> {
        Err(NodeError::Failed("boom".into()))
    }
}

/// Counts invocations and sleeps briefly, to observe concurrency.
pub struct CountingNode {
    pub calls: AtomicUsize,
    pub delay: Duration,
}

impl CountingNode {
    pub fn new(delay: Duration) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            delay,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Node for CountingNode {
    fn id(&self) -> &str {
        "count"
    }

    fn name(&self) -> &str {
        "Count"
    }

    fn inputs(&self, _ctx: &NodeContext<'_>) -> Vec<PortSpec> {
        Vec::new()
    }

    fn outputs(&self, _ctx: &NodeContext<'_>) -> Vec<PortSpec> {
        vec![PortSpec::new("value", "Value", wrapped::number())]
    }

    #[allow(clippy::cast_precision_loss)]
    async fn execute(&self, _inputs: ValueMap, _ctx: &NodeContext<'_>) -> Result<ValueMap, NodeError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(self.delay).await;
        Ok(ValueMap::from([("value".to_owned(), Value::Number(n as f64))]))
    }
}
