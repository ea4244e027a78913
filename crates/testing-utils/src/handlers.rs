//! Canned job handlers for tests
//!
//! Deterministic handlers covering the common execution outcomes:
//! immediate success, failure, slow success and progress reporting.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use jobq_domain::{HandlerContext, JobHandler, QueueError, QueueResult};

/// Returns `{"echoed": <payload>}` immediately
pub struct EchoHandler;

#[async_trait]
impl JobHandler for EchoHandler {
    async fn execute(&self, ctx: HandlerContext) -> QueueResult<Value> {
        Ok(json!({ "echoed": ctx.job.payload }))
    }

    fn name(&self) -> &str {
        "echo-handler"
    }
}

/// Always fails with the configured message
pub struct FailingHandler {
    message: String,
}

impl FailingHandler {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

#[async_trait]
impl JobHandler for FailingHandler {
    async fn execute(&self, _ctx: HandlerContext) -> QueueResult<Value> {
        Err(QueueError::internal(self.message.clone()))
    }

    fn name(&self) -> &str {
        "failing-handler"
    }
}

/// Sleeps for the configured duration, then succeeds with the given result.
/// Counts invocations so tests can assert how many jobs actually started.
pub struct SleepHandler {
    duration: Duration,
    result: Value,
    started: Arc<AtomicUsize>,
}

impl SleepHandler {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            result: json!("done"),
            started: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_result(mut self, result: Value) -> Self {
        self.result = result;
        self
    }

    pub fn started_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.started)
    }
}

#[async_trait]
impl JobHandler for SleepHandler {
    async fn execute(&self, _ctx: HandlerContext) -> QueueResult<Value> {
        self.started.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.duration).await;
        Ok(self.result.clone())
    }

    fn name(&self) -> &str {
        "sleep-handler"
    }
}

/// Reports the configured progress value, sleeps, then succeeds
pub struct ProgressReportingHandler {
    progress: u8,
    duration: Duration,
}

impl ProgressReportingHandler {
    pub fn new(progress: u8, duration: Duration) -> Self {
        Self { progress, duration }
    }
}

#[async_trait]
impl JobHandler for ProgressReportingHandler {
    async fn execute(&self, ctx: HandlerContext) -> QueueResult<Value> {
        ctx.progress.set(self.progress).await;
        tokio::time::sleep(self.duration).await;
        Ok(json!({ "reported": self.progress }))
    }

    fn name(&self) -> &str {
        "progress-handler"
    }
}
