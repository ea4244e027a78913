//! Polling helpers for async assertions
//!
//! Handlers run on spawned tasks, so tests observe terminal states by
//! polling the repository with a bounded deadline.

use std::time::Duration;

use jobq_domain::{Job, JobRepository, JobStatus};

const POLL_STEP: Duration = Duration::from_millis(10);

/// Polls until the job reaches the expected status or the deadline expires.
/// Panics with a descriptive message on timeout so test failures stay readable.
pub async fn wait_for_status(
    repo: &JobRepository,
    id: &str,
    status: JobStatus,
    deadline: Duration,
) -> Job {
    let started = tokio::time::Instant::now();
    loop {
        if let Ok(Some(job)) = repo.get(id).await {
            if job.status == status {
                return job;
            }
            if started.elapsed() > deadline {
                panic!(
                    "job {id} did not reach {status:?} within {deadline:?}, last status: {:?}",
                    job.status
                );
            }
        } else if started.elapsed() > deadline {
            panic!("job {id} not found within {deadline:?}");
        }
        tokio::time::sleep(POLL_STEP).await;
    }
}

/// Polls until the job is in any terminal state
pub async fn wait_until_finished(repo: &JobRepository, id: &str, deadline: Duration) -> Job {
    let started = tokio::time::Instant::now();
    loop {
        if let Ok(Some(job)) = repo.get(id).await {
            if job.is_finished() {
                return job;
            }
            if started.elapsed() > deadline {
                panic!(
                    "job {id} did not finish within {deadline:?}, last status: {:?}",
                    job.status
                );
            }
        } else if started.elapsed() > deadline {
            panic!("job {id} not found within {deadline:?}");
        }
        tokio::time::sleep(POLL_STEP).await;
    }
}
