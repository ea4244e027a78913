//! Test data builders for creating test entities
//!
//! Builder patterns with sensible defaults and easy customization.

use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use jobq_domain::{Job, JobPriority, JobSpec, JobStatus};

/// Builder for creating test Job entities
pub struct JobBuilder {
    job: Job,
}

impl JobBuilder {
    pub fn new() -> Self {
        Self {
            job: Job {
                id: Uuid::new_v4().to_string(),
                name: "test_job".to_string(),
                job_type: "echo".to_string(),
                status: JobStatus::Pending,
                priority: JobPriority::Normal,
                payload: serde_json::json!({}),
                result: None,
                error: None,
                progress: 0,
                timeout_ms: 300_000,
                created_at: Utc::now(),
                started_at: None,
                completed_at: None,
                metadata: None,
            },
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.job.id = id.to_string();
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.job.name = name.to_string();
        self
    }

    pub fn with_job_type(mut self, job_type: &str) -> Self {
        self.job.job_type = job_type.to_string();
        self
    }

    pub fn with_priority(mut self, priority: JobPriority) -> Self {
        self.job.priority = priority;
        self
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.job.payload = payload;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: i64) -> Self {
        self.job.timeout_ms = timeout_ms;
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.job.created_at = created_at;
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.job.metadata = Some(metadata);
        self
    }

    pub fn running(mut self) -> Self {
        self.job.status = JobStatus::Running;
        self.job.started_at = Some(Utc::now());
        self
    }

    pub fn completed(mut self, result: Value) -> Self {
        self.job.status = JobStatus::Completed;
        self.job.started_at = Some(Utc::now());
        self.job.completed_at = Some(Utc::now());
        self.job.result = Some(result);
        self.job.progress = 100;
        self
    }

    pub fn failed(mut self, error: &str) -> Self {
        self.job.status = JobStatus::Failed;
        self.job.completed_at = Some(Utc::now());
        self.job.error = Some(error.to_string());
        self
    }

    pub fn build(self) -> Job {
        self.job
    }
}

impl Default for JobBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for creating test JobSpec values
pub struct JobSpecBuilder {
    spec: JobSpec,
}

impl JobSpecBuilder {
    pub fn new(job_type: &str) -> Self {
        Self {
            spec: JobSpec::new(format!("{job_type}_job"), job_type),
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.spec.name = name.to_string();
        self
    }

    pub fn with_priority(mut self, priority: JobPriority) -> Self {
        self.spec.priority = priority;
        self
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.spec.payload = payload;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: i64) -> Self {
        self.spec.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn build(self) -> JobSpec {
        self.spec
    }
}
