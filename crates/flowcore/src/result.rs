use crate::port::exposed_port_id;
use crate::{NodeError, NodeId, NodeOutput, Value};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Metadata recorded alongside every node result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultMetadata {
    pub executed_at: DateTime<Utc>,
    pub node_id: NodeId,
    pub node_type: String,
    pub duration_ms: u64,
    pub attempts: u32,
    /// Never started because an upstream node did not succeed
    pub skipped: bool,
    pub custom: HashMap<String, Value>,
}

impl ResultMetadata {
    pub fn new(node_id: impl Into<NodeId>, node_type: impl Into<String>) -> Self {
        Self {
            executed_at: Utc::now(),
            node_id: node_id.into(),
            node_type: node_type.into(),
            duration_ms: 0,
            attempts: 0,
            skipped: false,
            custom: HashMap::new(),
        }
    }

    pub fn with_executed_at(mut self, executed_at: DateTime<Utc>) -> Self {
        self.executed_at = executed_at;
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration_ms = duration.as_millis() as u64;
        self
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }
}

/// Outcome of one node execution as seen by its orchestrator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<HashMap<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub metadata: ResultMetadata,
}

impl ExecutionResult {
    pub fn success(output: NodeOutput, mut metadata: ResultMetadata) -> Self {
        metadata.custom.extend(output.metadata);
        Self {
            success: true,
            outputs: Some(output.outputs),
            error: None,
            metadata,
        }
    }

    pub fn failure(error: impl Into<String>, metadata: ResultMetadata) -> Self {
        Self {
            success: false,
            outputs: None,
            error: Some(error.into()),
            metadata,
        }
    }

    pub fn skipped(reason: impl Into<String>, mut metadata: ResultMetadata) -> Self {
        metadata.skipped = true;
        Self::failure(reason, metadata)
    }

    pub fn from_outcome(outcome: Result<NodeOutput, NodeError>, metadata: ResultMetadata) -> Self {
        match outcome {
            Ok(output) => Self::success(output, metadata),
            Err(e) => Self::failure(e.to_string(), metadata),
        }
    }

    pub fn output(&self, port: &str) -> Option<&Value> {
        self.outputs.as_ref().and_then(|outputs| outputs.get(port))
    }

    pub fn is_skipped(&self) -> bool {
        self.metadata.skipped
    }
}

/// Aggregate outcome of running a composite's children
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeExecutionResult {
    pub success: bool,
    pub node_results: HashMap<NodeId, ExecutionResult>,
    /// Order in which children actually started
    pub execution_order: Vec<NodeId>,
    pub total_execution_time: Duration,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CompositeExecutionResult {
    /// A run that was refused before any child started.
    pub fn failure(error: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            success: false,
            node_results: HashMap::new(),
            execution_order: Vec::new(),
            total_execution_time: elapsed,
            error: Some(error.into()),
        }
    }

    pub fn result(&self, node_id: &str) -> Option<&ExecutionResult> {
        self.node_results.get(node_id)
    }

    pub fn completed_count(&self) -> usize {
        self.node_results.values().filter(|r| r.success).count()
    }

    pub fn failed_count(&self) -> usize {
        self.node_results
            .values()
            .filter(|r| !r.success && !r.is_skipped())
            .count()
    }

    pub fn skipped_count(&self) -> usize {
        self.node_results.values().filter(|r| r.is_skipped()).count()
    }

    /// Collapse the run into the single output a composite node reports to
    /// its own caller. Every successful child output is exposed as
    /// `{childId}_{portId}`.
    pub fn into_output(self) -> Result<NodeOutput, NodeError> {
        if !self.success {
            let error = self
                .error
                .unwrap_or_else(|| "Composite execution failed".to_string());
            return Err(NodeError::ExecutionFailed(error));
        }

        let mut output = NodeOutput::new()
            .with_metadata("total_nodes", self.node_results.len() as f64)
            .with_metadata("completed_nodes", self.completed_count() as f64)
            .with_metadata("failed_nodes", self.failed_count() as f64)
            .with_metadata("skipped_nodes", self.skipped_count() as f64)
            .with_metadata(
                "total_execution_time_ms",
                self.total_execution_time.as_millis() as f64,
            );

        for (node_id, result) in self.node_results {
            if let Some(outputs) = result.outputs {
                for (port, value) in outputs {
                    output.outputs.insert(exposed_port_id(&node_id, &port), value);
                }
            }
        }

        Ok(output)
    }
}
