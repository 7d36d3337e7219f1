use crate::builder::build_composite;
use crate::registry::NodeRegistry;
use flowcore::{
    CompositeDefinition, CompositeExecutionResult, EventBus, ExecutionContext, ExecutionEvent,
    ExecutionId, FlowError, GraphError, Node, Value,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Conductor-side entry point: builds definitions against a registry and
/// runs them with events published on a shared bus.
pub struct FlowRuntime {
    registry: Arc<NodeRegistry>,
    event_bus: Arc<EventBus>,
    config: RuntimeConfig,
    definitions: Arc<RwLock<HashMap<String, CompositeDefinition>>>,
}

impl FlowRuntime {
    /// Create a new runtime with default settings
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    /// Create a new runtime with custom configuration
    pub fn with_config(config: RuntimeConfig) -> Self {
        Self::with_registry(Arc::new(NodeRegistry::new()), config)
    }

    /// Create a new runtime with a pre-configured registry
    pub fn with_registry(registry: Arc<NodeRegistry>, config: RuntimeConfig) -> Self {
        let event_bus = Arc::new(EventBus::new(config.event_buffer_size));

        Self {
            registry,
            event_bus,
            config,
            definitions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn registry(&self) -> &Arc<NodeRegistry> {
        &self.registry
    }

    /// Register a definition for later execution by id
    pub async fn register_definition(&self, definition: CompositeDefinition) {
        let mut definitions = self.definitions.write().await;
        definitions.insert(definition.id.clone(), definition);
    }

    /// Execute a registered definition by id
    pub async fn execute_definition(
        &self,
        definition_id: &str,
        inputs: HashMap<String, Value>,
    ) -> Result<CompositeExecutionResult, FlowError> {
        let definition = {
            let definitions = self.definitions.read().await;
            definitions
                .get(definition_id)
                .cloned()
                .ok_or_else(|| GraphError::Invalid(format!("unknown definition {}", definition_id)))?
        };

        self.execute(&definition, inputs).await
    }

    /// Build and execute a definition directly (without registration)
    pub async fn execute(
        &self,
        definition: &CompositeDefinition,
        inputs: HashMap<String, Value>,
    ) -> Result<CompositeExecutionResult, FlowError> {
        let composite = build_composite(definition, self.registry.as_ref())?;

        let report = composite.validate();
        if !report.valid {
            return Err(FlowError::Graph(GraphError::Invalid(report.errors.join("; "))));
        }

        let events = self
            .event_bus
            .create_emitter(ExecutionId::new_v4(), composite.id());
        let mut ctx = ExecutionContext::with_events(composite.id(), events).with_inputs(inputs);
        if let Some(max_duration) = self.config.max_duration {
            ctx = ctx.with_max_duration(max_duration);
        }
        if let Some(stop_on_error) = self.config.stop_on_error {
            ctx = ctx.with_stop_on_error(stop_on_error);
        }

        let result = composite.run(ctx).await;
        if let Err(e) = composite.dispose().await {
            tracing::warn!("Failed to dispose composite {}: {}", composite.id(), e);
        }
        Ok(result)
    }

    /// Subscribe to execution events
    pub fn subscribe_events(&self) -> tokio::sync::broadcast::Receiver<ExecutionEvent> {
        self.event_bus.subscribe()
    }

    /// Get the event bus for direct access
    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }
}

impl Default for FlowRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration for the runtime
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub event_buffer_size: usize,
    /// Time budget handed to every run
    pub max_duration: Option<Duration>,
    /// Overrides the stop-on-first-failure default when set
    pub stop_on_error: Option<bool>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            event_buffer_size: 1000,
            max_duration: None,
            stop_on_error: None,
        }
    }
}
