use crate::{DataType, EventEmitter, ExecutionId, ExecutionResult, NodeError, NodeId, Value};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Time budget granted to an execution
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionLimits {
    pub max_duration: Option<Duration>,
}

/// Execution context passed to each node
#[derive(Clone)]
pub struct ExecutionContext {
    pub execution_id: ExecutionId,

    /// Node this context was built for
    pub node_id: NodeId,

    /// Composite orchestrating this node, if any
    pub parent_id: Option<NodeId>,

    /// Input values keyed by port id
    pub inputs: HashMap<String, Value>,

    /// Static configuration for this node
    pub config: HashMap<String, Value>,

    /// Variables declared by the enclosing composite definition
    pub variables: Arc<HashMap<String, Value>>,

    pub started_at: DateTime<Utc>,

    pub limits: ExecutionLimits,

    /// Progress and log events for listeners
    pub events: EventEmitter,

    /// Structured logging scope for everything this node does
    pub span: tracing::Span,

    /// `None` means the default: stop on the first failure.
    pub stop_on_error: Option<bool>,

    /// Results of siblings that finished before this node started
    pub previous_results: Arc<HashMap<NodeId, ExecutionResult>>,

    /// Cooperative cancellation signal
    pub cancellation: CancellationToken,
}

impl ExecutionContext {
    pub fn new(node_id: impl Into<NodeId>) -> Self {
        let node_id = node_id.into();
        let events = EventEmitter::detached(node_id.clone());
        Self::with_events(node_id, events)
    }

    /// Build a root context that reports into an existing emitter
    pub fn with_events(node_id: impl Into<NodeId>, events: EventEmitter) -> Self {
        let node_id = node_id.into();
        Self {
            execution_id: events.execution_id(),
            span: tracing::info_span!("node", node_id = %node_id),
            events,
            node_id,
            parent_id: None,
            inputs: HashMap::new(),
            config: HashMap::new(),
            variables: Arc::new(HashMap::new()),
            started_at: Utc::now(),
            limits: ExecutionLimits::default(),
            stop_on_error: None,
            previous_results: Arc::new(HashMap::new()),
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_input(mut self, port: impl Into<String>, value: impl Into<Value>) -> Self {
        self.inputs.insert(port.into(), value.into());
        self
    }

    pub fn with_inputs(mut self, inputs: HashMap<String, Value>) -> Self {
        self.inputs.extend(inputs);
        self
    }

    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    pub fn with_variables(mut self, variables: HashMap<String, Value>) -> Self {
        self.variables = Arc::new(variables);
        self
    }

    pub fn with_stop_on_error(mut self, stop_on_error: bool) -> Self {
        self.stop_on_error = Some(stop_on_error);
        self
    }

    pub fn with_max_duration(mut self, max_duration: Duration) -> Self {
        self.limits.max_duration = Some(max_duration);
        self
    }

    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// Derive the context a composite hands to one of its children.
    pub fn for_child(
        &self,
        child_id: &str,
        inputs: HashMap<String, Value>,
        previous_results: Arc<HashMap<NodeId, ExecutionResult>>,
    ) -> Self {
        Self {
            execution_id: self.execution_id,
            node_id: child_id.to_string(),
            parent_id: Some(self.node_id.clone()),
            inputs,
            config: HashMap::new(),
            variables: Arc::clone(&self.variables),
            started_at: Utc::now(),
            limits: self.limits,
            events: self.events.for_node(child_id),
            span: tracing::info_span!(
                parent: &self.span,
                "node",
                node_id = %child_id,
                parent_id = %self.node_id
            ),
            stop_on_error: self.stop_on_error,
            previous_results,
            cancellation: self.cancellation.child_token(),
        }
    }

    /// Get required input or return error
    pub fn require_input(&self, name: &str) -> Result<&Value, NodeError> {
        self.inputs
            .get(name)
            .ok_or_else(|| NodeError::MissingInput(name.to_string()))
    }

    /// Get a required input that must hold a value of `expected` type
    pub fn require_input_of(&self, name: &str, expected: DataType) -> Result<&Value, NodeError> {
        let value = self.require_input(name)?;
        if value.matches(expected) {
            Ok(value)
        } else {
            Err(type_mismatch(name, expected, value))
        }
    }

    pub fn require_str(&self, name: &str) -> Result<&str, NodeError> {
        let value = self.require_input_of(name, DataType::String)?;
        value
            .as_str()
            .ok_or_else(|| type_mismatch(name, DataType::String, value))
    }

    pub fn require_number(&self, name: &str) -> Result<f64, NodeError> {
        let value = self.require_input_of(name, DataType::Number)?;
        value
            .as_f64()
            .ok_or_else(|| type_mismatch(name, DataType::Number, value))
    }

    /// Get config value or return error
    pub fn require_config(&self, name: &str) -> Result<&Value, NodeError> {
        self.config
            .get(name)
            .ok_or_else(|| NodeError::Configuration(format!("Missing config: {}", name)))
    }

    /// Get config with default
    pub fn get_config_or(&self, name: &str, default: Value) -> Value {
        self.config.get(name).cloned().unwrap_or(default)
    }

    pub fn previous_result(&self, node_id: &str) -> Option<&ExecutionResult> {
        self.previous_results.get(node_id)
    }

    pub fn report_progress(&self, percent: f64, message: Option<String>) {
        self.events.progress(percent.clamp(0.0, 100.0), message);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    pub fn elapsed(&self) -> Duration {
        (Utc::now() - self.started_at).to_std().unwrap_or_default()
    }

    pub fn time_remaining(&self) -> Option<Duration> {
        self.limits
            .max_duration
            .map(|max| max.saturating_sub(self.elapsed()))
    }

    /// Cooperative check a long-running node calls between units of work.
    pub fn check_budget(&self) -> Result<(), NodeError> {
        if self.is_cancelled() {
            return Err(NodeError::Cancelled);
        }
        match (self.limits.max_duration, self.time_remaining()) {
            (Some(max), Some(remaining)) if remaining.is_zero() => Err(NodeError::Timeout {
                millis: max.as_millis() as u64,
            }),
            _ => Ok(()),
        }
    }
}

fn type_mismatch(field: &str, expected: DataType, value: &Value) -> NodeError {
    NodeError::InvalidInputType {
        field: field.to_string(),
        expected: expected.as_str().to_string(),
        actual: value.type_name().to_string(),
    }
}
