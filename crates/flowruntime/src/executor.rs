use crate::dependency::DependencyGraph;
use crate::policy::{invoke, Invocation, InvocationPolicy};
use chrono::{DateTime, Utc};
use flowcore::port::exposed_port_id;
use flowcore::{
    CompositeExecutionResult, Edge, ExecutionContext, ExecutionEvent, ExecutionResult,
    ExecutionSettings, GraphError, Node, NodeError, NodeId, ResultMetadata, Value,
};
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::task::AbortOnDropHandle;

/// Runs a set of children in dependency order, sequentially or with
/// bounded concurrency, and folds their results into one.
pub struct CompositeExecutor {
    settings: ExecutionSettings,
    policy: InvocationPolicy,
}

/// Bookkeeping shared by both strategies
struct RunState {
    results: HashMap<NodeId, ExecutionResult>,
    execution_order: Vec<NodeId>,
    /// Children that failed or were skipped; their dependents never start
    blocked: HashSet<NodeId>,
    /// Set once a failure must stop the run
    fatal: Option<String>,
}

impl RunState {
    fn new() -> Self {
        Self {
            results: HashMap::new(),
            execution_order: Vec::new(),
            blocked: HashSet::new(),
            fatal: None,
        }
    }

    fn snapshot(&self) -> Arc<HashMap<NodeId, ExecutionResult>> {
        Arc::new(self.results.clone())
    }

    fn blocking_dependency(&self, dependencies: &[NodeId]) -> Option<NodeId> {
        dependencies
            .iter()
            .find(|d| self.blocked.contains(*d))
            .cloned()
    }
}

/// Everything fixed for the duration of one run
struct Plan<'a> {
    nodes: HashMap<&'a str, &'a Arc<dyn Node>>,
    edges: &'a [Edge],
    graph: DependencyGraph,
    order: Vec<NodeId>,
    ctx: &'a ExecutionContext,
    stop_on_error: bool,
    /// Per-attempt time limit, surfaced to children through their context
    budget: Option<Duration>,
}

impl<'a> Plan<'a> {
    fn new(
        nodes: &'a [Arc<dyn Node>],
        edges: &'a [Edge],
        ctx: &'a ExecutionContext,
        budget: Option<Duration>,
    ) -> Result<Self, GraphError> {
        let graph = DependencyGraph::build(nodes.iter().map(|n| n.id().to_string()), edges)?;
        let order = graph.topological_order()?;

        Ok(Self {
            nodes: nodes.iter().map(|n| (n.id(), n)).collect(),
            edges,
            graph,
            order,
            ctx,
            stop_on_error: ctx.stop_on_error != Some(false),
            budget,
        })
    }

    fn node(&self, node_id: &str) -> &'a Arc<dyn Node> {
        // every id in the plan came from `nodes`
        self.nodes[node_id]
    }

    /// Inputs for a child: values routed from the composite's own exposed
    /// inputs, then upstream outputs along edges, then port defaults.
    fn collect_inputs(
        &self,
        node: &dyn Node,
        results: &HashMap<NodeId, ExecutionResult>,
    ) -> HashMap<String, Value> {
        let ports = node.input_ports();
        let mut inputs = HashMap::new();

        for port in &ports {
            if let Some(value) = self.ctx.inputs.get(&exposed_port_id(node.id(), &port.id)) {
                inputs.insert(port.id.clone(), value.clone());
            }
        }

        for edge in self.edges.iter().filter(|e| e.target.node_id == node.id()) {
            let Some(value) = results
                .get(&edge.source.node_id)
                .and_then(|r| r.output(&edge.source.port_id))
            else {
                continue;
            };

            let multiple = ports
                .iter()
                .any(|p| p.id == edge.target.port_id && p.multiple);
            if !multiple {
                inputs.insert(edge.target.port_id.clone(), value.clone());
                continue;
            }

            let slot = inputs
                .entry(edge.target.port_id.clone())
                .or_insert_with(|| Value::Array(Vec::new()));
            match slot {
                Value::Array(items) => items.push(value.clone()),
                other => {
                    let first = std::mem::replace(other, Value::Null);
                    *other = Value::Array(vec![first, value.clone()]);
                }
            }
        }

        for port in ports {
            if let Some(default) = port.default_value {
                inputs.entry(port.id).or_insert(default);
            }
        }

        inputs
    }

    fn child_context(&self, node: &dyn Node, state: &RunState) -> ExecutionContext {
        let inputs = self.collect_inputs(node, &state.results);
        let mut child = self.ctx.for_child(node.id(), inputs, state.snapshot());
        if let Some(budget) = self.budget {
            child.limits.max_duration = Some(match child.limits.max_duration {
                Some(inherited) => inherited.min(budget),
                None => budget,
            });
        }
        child
    }

    fn mark_started(&self, state: &mut RunState, node: &dyn Node) -> DateTime<Utc> {
        let started_at = Utc::now();
        tracing::debug!(node_id = node.id(), node_type = node.node_type(), "Starting node");
        state.execution_order.push(node.id().to_string());
        self.ctx.events.publish(ExecutionEvent::NodeStarted {
            execution_id: self.ctx.execution_id,
            node_id: node.id().to_string(),
            parent_id: Some(self.ctx.node_id.clone()),
            node_type: node.node_type().to_string(),
            timestamp: started_at,
        });
        started_at
    }

    fn record(
        &self,
        state: &mut RunState,
        node: &dyn Node,
        started_at: DateTime<Utc>,
        invocation: Invocation,
    ) {
        let node_id = node.id().to_string();
        let metadata = ResultMetadata::new(node.id(), node.node_type())
            .with_executed_at(started_at)
            .with_duration(invocation.duration)
            .with_attempts(invocation.attempts);
        let result = ExecutionResult::from_outcome(invocation.outcome, metadata);

        if result.success {
            tracing::info!(
                node_id = %node_id,
                duration_ms = result.metadata.duration_ms,
                "Node completed"
            );
            self.ctx.events.publish(ExecutionEvent::NodeCompleted {
                execution_id: self.ctx.execution_id,
                node_id: node_id.clone(),
                outputs: result.outputs.clone().unwrap_or_default(),
                duration_ms: result.metadata.duration_ms,
                timestamp: Utc::now(),
            });
        } else {
            let error = result.error.clone().unwrap_or_default();
            tracing::error!(node_id = %node_id, "Node failed: {}", error);
            self.ctx.events.publish(ExecutionEvent::NodeFailed {
                execution_id: self.ctx.execution_id,
                node_id: node_id.clone(),
                error: error.clone(),
                timestamp: Utc::now(),
            });

            state.blocked.insert(node_id.clone());
            if self.stop_on_error && state.fatal.is_none() {
                state.fatal = Some(format!("Node {} failed: {}", node_id, error));
            }
        }

        state.results.insert(node_id, result);
    }

    fn skip(&self, state: &mut RunState, node_id: &str, blocker: &str) {
        let node = self.node(node_id);
        let reason = format!("Skipped: dependency {} did not succeed", blocker);
        tracing::warn!(node_id, blocker, "Skipping node");
        self.ctx.events.publish(ExecutionEvent::NodeSkipped {
            execution_id: self.ctx.execution_id,
            node_id: node_id.to_string(),
            reason: reason.clone(),
            timestamp: Utc::now(),
        });

        let metadata = ResultMetadata::new(node_id, node.node_type());
        state
            .results
            .insert(node_id.to_string(), ExecutionResult::skipped(reason, metadata));
        state.blocked.insert(node_id.to_string());
    }
}

impl CompositeExecutor {
    pub fn new(settings: ExecutionSettings) -> Self {
        let policy = InvocationPolicy::from(&settings);
        Self { settings, policy }
    }

    pub fn settings(&self) -> &ExecutionSettings {
        &self.settings
    }

    /// Execute `nodes` wired by `edges` under the composite context `ctx`.
    ///
    /// Structural problems and cycles are reported before any child runs.
    /// Every failure surfaces through the returned result; this never errors.
    pub async fn execute(
        &self,
        nodes: &[Arc<dyn Node>],
        edges: &[Edge],
        ctx: &ExecutionContext,
    ) -> CompositeExecutionResult {
        let start_time = Instant::now();

        let plan = match Plan::new(nodes, edges, ctx, self.policy.timeout) {
            Ok(plan) => plan,
            Err(e) => {
                tracing::error!(composite_id = %ctx.node_id, "Refusing to execute: {}", e);
                return CompositeExecutionResult::failure(e.to_string(), start_time.elapsed());
            }
        };

        tracing::info!(
            composite_id = %ctx.node_id,
            nodes = nodes.len(),
            parallel = self.settings.parallel,
            "Starting composite execution"
        );
        ctx.events.publish(ExecutionEvent::CompositeStarted {
            execution_id: ctx.execution_id,
            composite_id: ctx.node_id.clone(),
            total_nodes: nodes.len(),
            parallel: self.settings.parallel,
            timestamp: Utc::now(),
        });

        let state = if self.settings.parallel {
            self.run_parallel(&plan).await
        } else {
            self.run_sequential(&plan).await
        };

        let total_execution_time = start_time.elapsed();
        let error = state.fatal.or_else(|| summarize_failures(&plan.order, &state.results));
        let success = error.is_none();

        tracing::info!(
            composite_id = %ctx.node_id,
            success,
            started = state.execution_order.len(),
            duration_ms = total_execution_time.as_millis() as u64,
            "Composite execution finished"
        );
        ctx.events.publish(ExecutionEvent::CompositeCompleted {
            execution_id: ctx.execution_id,
            composite_id: ctx.node_id.clone(),
            success,
            duration_ms: total_execution_time.as_millis() as u64,
            timestamp: Utc::now(),
        });

        CompositeExecutionResult {
            success,
            node_results: state.results,
            execution_order: state.execution_order,
            total_execution_time,
            error,
        }
    }

    async fn run_sequential(&self, plan: &Plan<'_>) -> RunState {
        let mut state = RunState::new();

        for node_id in &plan.order {
            if let Some(blocker) = state.blocking_dependency(plan.graph.dependencies(node_id)) {
                plan.skip(&mut state, node_id, &blocker);
                continue;
            }

            let node = plan.node(node_id);
            let child_ctx = plan.child_context(node.as_ref(), &state);
            let started_at = plan.mark_started(&mut state, node.as_ref());

            let invocation = invoke(Arc::clone(node), child_ctx, &self.policy).await;
            plan.record(&mut state, node.as_ref(), started_at, invocation);

            if state.fatal.is_some() {
                break;
            }
        }

        state
    }

    async fn run_parallel(&self, plan: &Plan<'_>) -> RunState {
        let max_concurrency = self.settings.effective_concurrency();
        let mut state = RunState::new();
        let mut completed: HashSet<NodeId> = HashSet::new();
        let mut executing: HashSet<NodeId> = HashSet::new();
        // dropping the run aborts whatever is still in flight
        let mut running = FuturesUnordered::new();
        // kept in topological order, so dependents always sit behind their dependencies
        let mut pending: Vec<NodeId> = plan.order.clone();

        loop {
            let mut index = 0;
            while state.fatal.is_none()
                && index < pending.len()
                && executing.len() < max_concurrency
            {
                let dependencies = plan.graph.dependencies(&pending[index]);
                if !dependencies.iter().all(|d| completed.contains(d)) {
                    index += 1;
                    continue;
                }

                let node_id = pending.remove(index);
                if let Some(blocker) = state.blocking_dependency(dependencies) {
                    plan.skip(&mut state, &node_id, &blocker);
                    completed.insert(node_id);
                    continue;
                }

                let node = Arc::clone(plan.node(&node_id));
                let child_ctx = plan.child_context(node.as_ref(), &state);
                let started_at = plan.mark_started(&mut state, node.as_ref());
                executing.insert(node_id.clone());

                let policy = self.policy.clone();
                let handle = AbortOnDropHandle::new(tokio::spawn(async move {
                    invoke(node, child_ctx, &policy).await
                }));
                running.push(async move { (node_id, started_at, handle.await) });
            }

            // nothing in flight and nothing startable: done
            let Some((node_id, started_at, joined)) = running.next().await else {
                break;
            };

            executing.remove(&node_id);
            let invocation = joined.unwrap_or_else(|e| Invocation {
                outcome: Err(NodeError::ExecutionFailed(format!("Task join error: {}", e))),
                attempts: 1,
                duration: Duration::ZERO,
            });
            plan.record(&mut state, plan.node(&node_id).as_ref(), started_at, invocation);
            completed.insert(node_id);
        }

        if !pending.is_empty() {
            tracing::debug!(not_started = pending.len(), "Parallel run stopped early");
        }

        state
    }
}

fn summarize_failures(
    order: &[NodeId],
    results: &HashMap<NodeId, ExecutionResult>,
) -> Option<String> {
    let failures: Vec<String> = order
        .iter()
        .filter_map(|id| results.get(id).map(|r| (id, r)))
        .filter(|(_, r)| !r.success)
        .map(|(id, r)| format!("{} ({})", id, r.error.as_deref().unwrap_or("unknown error")))
        .collect();

    if failures.is_empty() {
        None
    } else {
        Some(format!(
            "{} node(s) did not succeed: {}",
            failures.len(),
            failures.join(", ")
        ))
    }
}
