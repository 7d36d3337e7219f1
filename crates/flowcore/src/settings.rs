use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How a composite schedules its children
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExecutionSettings {
    /// Run independent children concurrently
    pub parallel: bool,

    /// Hard cap on children in flight when `parallel` is set
    pub max_concurrency: usize,

    /// Per-child timeout in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    /// Extra attempts after a failed child invocation
    pub retries: u32,

    /// Delay between attempts in milliseconds
    pub retry_delay: u64,
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            parallel: false,
            max_concurrency: 10,
            timeout: None,
            retries: 0,
            retry_delay: 0,
        }
    }
}

impl ExecutionSettings {
    pub fn sequential() -> Self {
        Self::default()
    }

    pub fn parallel(max_concurrency: usize) -> Self {
        Self {
            parallel: true,
            max_concurrency,
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout.as_millis() as u64);
        self
    }

    pub fn with_retries(mut self, retries: u32, delay: Duration) -> Self {
        self.retries = retries;
        self.retry_delay = delay.as_millis() as u64;
        self
    }

    pub fn timeout_duration(&self) -> Option<Duration> {
        self.timeout.map(Duration::from_millis)
    }

    pub fn retry_delay_duration(&self) -> Duration {
        Duration::from_millis(self.retry_delay)
    }

    /// Concurrency bound actually enforced; zero would never make progress.
    pub fn effective_concurrency(&self) -> usize {
        self.max_concurrency.max(1)
    }
}
