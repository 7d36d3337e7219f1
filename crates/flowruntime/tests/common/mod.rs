// Shared test nodes for the runtime integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use flowcore::{
    DataType, ExecutionContext, Node, NodeError, NodeOutput, PortDefinition, Value,
};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Adds a constant to its numeric `value` input and emits `result`.
pub struct AddNode {
    pub id: String,
    pub amount: f64,
}

impl AddNode {
    pub fn new(id: &str, amount: f64) -> Arc<dyn Node> {
        Arc::new(Self {
            id: id.to_string(),
            amount,
        })
    }
}

#[async_trait]
impl Node for AddNode {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.id
    }

    fn node_type(&self) -> &str {
        "test.add"
    }

    fn input_ports(&self) -> Vec<PortDefinition> {
        vec![PortDefinition::input("value", "Value", DataType::Number).required()]
    }

    fn output_ports(&self) -> Vec<PortDefinition> {
        vec![PortDefinition::output("result", "Result", DataType::Number)]
    }

    async fn execute(&self, ctx: ExecutionContext) -> Result<NodeOutput, NodeError> {
        let value = ctx.require_number("value")?;
        Ok(NodeOutput::new().with_output("result", value + self.amount))
    }
}

/// Always fails with the given message.
pub struct FailNode {
    pub id: String,
    pub message: String,
}

impl FailNode {
    pub fn new(id: &str, message: &str) -> Arc<dyn Node> {
        Arc::new(Self {
            id: id.to_string(),
            message: message.to_string(),
        })
    }
}

#[async_trait]
impl Node for FailNode {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.id
    }

    fn node_type(&self) -> &str {
        "test.fail"
    }

    async fn execute(&self, _ctx: ExecutionContext) -> Result<NodeOutput, NodeError> {
        Err(NodeError::ExecutionFailed(self.message.clone()))
    }
}

/// Emits a fixed value on `out`.
pub struct ConstNode {
    pub id: String,
    pub value: Value,
}

impl ConstNode {
    pub fn new(id: &str, value: impl Into<Value>) -> Arc<dyn Node> {
        Arc::new(Self {
            id: id.to_string(),
            value: value.into(),
        })
    }
}

#[async_trait]
impl Node for ConstNode {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.id
    }

    fn node_type(&self) -> &str {
        "test.const"
    }

    fn output_ports(&self) -> Vec<PortDefinition> {
        vec![PortDefinition::output("out", "Out", DataType::Any)]
    }

    async fn execute(&self, _ctx: ExecutionContext) -> Result<NodeOutput, NodeError> {
        Ok(NodeOutput::new().with_output("out", self.value.clone()))
    }
}

/// Records start/finish of every tracked node and the peak number in flight.
#[derive(Default)]
pub struct Tracker {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    log: Mutex<Vec<(String, &'static str)>>,
}

impl Tracker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn log(&self) -> Vec<(String, &'static str)> {
        self.log.lock().unwrap().clone()
    }

    pub fn position(&self, id: &str, event: &'static str) -> usize {
        self.log()
            .iter()
            .position(|(n, e)| n == id && *e == event)
            .unwrap_or_else(|| panic!("no {} event for {}", event, id))
    }

    pub fn count(&self, event: &'static str) -> usize {
        self.log().iter().filter(|(_, e)| *e == event).count()
    }

    fn enter(&self, id: &str) -> InFlight<'_> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.log.lock().unwrap().push((id.to_string(), "start"));
        InFlight { tracker: self }
    }

    fn finish(&self, id: &str) {
        self.log.lock().unwrap().push((id.to_string(), "finish"));
    }
}

/// Leaves the in-flight count when dropped, so an aborted node still counts
/// as gone even though it never logs "finish".
pub struct InFlight<'a> {
    tracker: &'a Tracker,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.tracker.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Sleeps for a while, reporting to a tracker. Passes `in` through to `out`.
pub struct TrackedNode {
    pub id: String,
    pub delay: Duration,
    pub tracker: Arc<Tracker>,
    pub fail: bool,
}

impl TrackedNode {
    pub fn new(id: &str, delay_ms: u64, tracker: &Arc<Tracker>) -> Arc<dyn Node> {
        Arc::new(Self {
            id: id.to_string(),
            delay: Duration::from_millis(delay_ms),
            tracker: Arc::clone(tracker),
            fail: false,
        })
    }

    pub fn failing(id: &str, delay_ms: u64, tracker: &Arc<Tracker>) -> Arc<dyn Node> {
        Arc::new(Self {
            id: id.to_string(),
            delay: Duration::from_millis(delay_ms),
            tracker: Arc::clone(tracker),
            fail: true,
        })
    }
}

#[async_trait]
impl Node for TrackedNode {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.id
    }

    fn node_type(&self) -> &str {
        "test.tracked"
    }

    fn input_ports(&self) -> Vec<PortDefinition> {
        vec![PortDefinition::input("in", "In", DataType::Any).multiple()]
    }

    fn output_ports(&self) -> Vec<PortDefinition> {
        vec![PortDefinition::output("out", "Out", DataType::Any)]
    }

    async fn execute(&self, ctx: ExecutionContext) -> Result<NodeOutput, NodeError> {
        let in_flight = self.tracker.enter(&self.id);
        tokio::time::sleep(self.delay).await;
        self.tracker.finish(&self.id);
        drop(in_flight);

        if self.fail {
            return Err(NodeError::ExecutionFailed(format!("{} exploded", self.id)));
        }
        let passthrough = ctx.inputs.get("in").cloned().unwrap_or(Value::Null);
        Ok(NodeOutput::new().with_output("out", passthrough))
    }
}

/// Fails a fixed number of times before succeeding.
pub struct FlakyNode {
    pub id: String,
    pub failures: u32,
    pub calls: AtomicU32,
}

impl FlakyNode {
    pub fn new(id: &str, failures: u32) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            failures,
            calls: AtomicU32::new(0),
        })
    }
}

#[async_trait]
impl Node for FlakyNode {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.id
    }

    fn node_type(&self) -> &str {
        "test.flaky"
    }

    async fn execute(&self, _ctx: ExecutionContext) -> Result<NodeOutput, NodeError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call <= self.failures {
            Err(NodeError::ExecutionFailed(format!("attempt {} failed", call)))
        } else {
            Ok(NodeOutput::new().with_output("calls", call as f64))
        }
    }
}

/// Panics when executed.
pub struct PanicNode {
    pub id: String,
}

#[async_trait]
impl Node for PanicNode {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.id
    }

    fn node_type(&self) -> &str {
        "test.panic"
    }

    async fn execute(&self, _ctx: ExecutionContext) -> Result<NodeOutput, NodeError> {
        panic!("boom")
    }
}

/// Counts dispose calls.
pub struct DisposableNode {
    pub id: String,
    pub disposed: AtomicU32,
}

impl DisposableNode {
    pub fn new(id: &str) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            disposed: AtomicU32::new(0),
        })
    }

    pub fn dispose_count(&self) -> u32 {
        self.disposed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Node for DisposableNode {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.id
    }

    fn node_type(&self) -> &str {
        "test.disposable"
    }

    async fn execute(&self, _ctx: ExecutionContext) -> Result<NodeOutput, NodeError> {
        Ok(NodeOutput::new())
    }

    async fn dispose(&self) -> Result<(), NodeError> {
        self.disposed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
