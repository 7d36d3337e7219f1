//! Retry and timeout handling around a single node invocation.
//!
//! The executor decides *when* a child runs; this module decides *how* one
//! call to `execute` is carried out.

use chrono::Utc;
use flowcore::{ExecutionContext, ExecutionSettings, Node, NodeError, NodeOutput};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::{sleep, timeout};
use tracing::Instrument;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvocationPolicy {
    pub timeout: Option<Duration>,
    pub retries: u32,
    pub retry_delay: Duration,
}

impl From<&ExecutionSettings> for InvocationPolicy {
    fn from(settings: &ExecutionSettings) -> Self {
        Self {
            timeout: settings.timeout_duration(),
            retries: settings.retries,
            retry_delay: settings.retry_delay_duration(),
        }
    }
}

/// What happened when a node was invoked under a policy
#[derive(Debug)]
pub struct Invocation {
    pub outcome: Result<NodeOutput, NodeError>,
    pub attempts: u32,
    pub duration: Duration,
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// One call to `execute` under its own cancellation token and clock. When
/// the timeout fires, the token is cancelled before the call is dropped so
/// work the node handed off elsewhere is told to stop as well.
async fn attempt(
    node: &Arc<dyn Node>,
    ctx: &ExecutionContext,
    limit: Option<Duration>,
) -> Result<NodeOutput, NodeError> {
    let mut attempt_ctx = ctx.clone();
    attempt_ctx.cancellation = ctx.cancellation.child_token();
    attempt_ctx.started_at = Utc::now();
    let token = attempt_ctx.cancellation.clone();

    let span = attempt_ctx.span.clone();
    let call = AssertUnwindSafe(node.execute(attempt_ctx))
        .catch_unwind()
        .instrument(span);

    let caught = match limit {
        Some(duration) => match timeout(duration, call).await {
            Ok(caught) => caught,
            Err(_) => {
                token.cancel();
                return Err(NodeError::Timeout {
                    millis: duration.as_millis() as u64,
                });
            }
        },
        None => call.await,
    };

    caught.unwrap_or_else(|payload| Err(NodeError::Panicked(panic_message(payload))))
}

/// Run `node` with retries and a per-attempt timeout.
///
/// A cancelled context is never (re)started, and a `Cancelled` failure is
/// not retried.
pub async fn invoke(
    node: Arc<dyn Node>,
    ctx: ExecutionContext,
    policy: &InvocationPolicy,
) -> Invocation {
    let start = Instant::now();
    let mut attempts = 0;

    loop {
        if ctx.is_cancelled() {
            return Invocation {
                outcome: Err(NodeError::Cancelled),
                attempts,
                duration: start.elapsed(),
            };
        }

        attempts += 1;
        let outcome = attempt(&node, &ctx, policy.timeout).await;

        let retryable = matches!(&outcome, Err(e) if *e != NodeError::Cancelled);
        if !retryable || attempts > policy.retries {
            return Invocation {
                outcome,
                attempts,
                duration: start.elapsed(),
            };
        }

        if let Err(e) = &outcome {
            tracing::warn!(
                node_id = %ctx.node_id,
                attempt = attempts,
                max_attempts = policy.retries + 1,
                "Node attempt failed, retrying: {}",
                e
            );
            ctx.events
                .warn(format!("Attempt {} failed, retrying: {}", attempts, e));
        }

        if !policy.retry_delay.is_zero() {
            sleep(policy.retry_delay).await;
        }
    }
}
