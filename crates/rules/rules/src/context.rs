use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

use crate::executor::ExecutorKind;
use crate::graph::RuleGraph;

/// One entry of the execution call stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallFrame {
    pub kind: ExecutorKind,
    pub id: String,
}

impl fmt::Display for CallFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} `{}`", self.kind, self.id)
    }
}

/// Per-execution state shared by every executor taking part in one call.
///
/// The graph is a snapshot: a concurrent reload never changes the graph an
/// execution already started with.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// Unique identifier of this execution, used in tracing spans.
    pub execution_id: Uuid,
    /// Rules and rule sets resolvable during this execution.
    pub graph: Arc<RuleGraph>,
    /// Executors currently running, outermost first.
    pub call_stack: Vec<CallFrame>,
}

impl ExecutionContext {
    pub fn new(graph: Arc<RuleGraph>) -> Self {
        Self {
            execution_id: Uuid::now_v7(),
            graph,
            call_stack: Vec::new(),
        }
    }

    /// A copy of this context with one more frame on the call stack.
    #[must_use]
    pub fn child(&self, kind: ExecutorKind, id: &str) -> Self {
        let mut call_stack = Vec::with_capacity(self.call_stack.len() + 1);
        call_stack.extend(self.call_stack.iter().cloned());
        call_stack.push(CallFrame {
            kind,
            id: id.to_owned(),
        });
        Self {
            execution_id: self.execution_id,
            graph: Arc::clone(&self.graph),
            call_stack,
        }
    }

    /// The innermost running executor, if any.
    pub fn current(&self) -> Option<&CallFrame> {
        self.call_stack.last()
    }

    /// Render the call stack as `rule set `a` > rule `b` > ...`.
    pub fn trace(&self) -> String {
        self.call_stack
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" > ")
    }
}
