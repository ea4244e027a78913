#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use serde_json::json;

    use jobq_dispatcher::{JobQueue, QueueConfig};
    use jobq_domain::{JobPriority, JobRepository, JobStatus, QueueError};
    use jobq_infrastructure::MemoryStore;
    use jobq_testing_utils::{
        wait_for_status, wait_until_finished, EchoHandler, FailingHandler, FailingStore,
        JobSpecBuilder, SleepHandler,
    };

    fn test_config(max_concurrent_jobs: usize) -> QueueConfig {
        QueueConfig {
            max_concurrent_jobs,
            poll_interval_ms: 50,
            default_timeout_ms: 5_000,
        }
    }

    fn setup(max_concurrent_jobs: usize) -> (JobQueue, JobRepository) {
        let store = Arc::new(MemoryStore::new());
        let queue = JobQueue::new(store.clone(), test_config(max_concurrent_jobs)).unwrap();
        (queue, JobRepository::new(store))
    }

    #[tokio::test]
    async fn test_higher_priority_dispatched_first() {
        let (queue, repo) = setup(1);
        queue
            .register_handler("sleep", Arc::new(SleepHandler::new(Duration::from_millis(200))))
            .await;

        // Low-priority job arrives first, high-priority second
        let low = queue
            .create_job(
                JobSpecBuilder::new("sleep")
                    .with_priority(JobPriority::Low)
                    .build(),
            )
            .await
            .unwrap();
        let high = queue
            .create_job(
                JobSpecBuilder::new("sleep")
                    .with_priority(JobPriority::High)
                    .build(),
            )
            .await
            .unwrap();

        let dispatched = queue.poll_once().await.unwrap();
        assert_eq!(dispatched, 1);

        assert_eq!(
            repo.get(&high.id).await.unwrap().unwrap().status,
            JobStatus::Running
        );
        assert_eq!(
            repo.get(&low.id).await.unwrap().unwrap().status,
            JobStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_equal_priority_is_fifo() {
        let (queue, repo) = setup(1);
        queue
            .register_handler("sleep", Arc::new(SleepHandler::new(Duration::from_millis(200))))
            .await;

        let first = queue
            .create_job(JobSpecBuilder::new("sleep").build())
            .await
            .unwrap();
        let second = queue
            .create_job(JobSpecBuilder::new("sleep").build())
            .await
            .unwrap();

        queue.poll_once().await.unwrap();

        assert_eq!(
            repo.get(&first.id).await.unwrap().unwrap().status,
            JobStatus::Running
        );
        assert_eq!(
            repo.get(&second.id).await.unwrap().unwrap().status,
            JobStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_concurrency_ceiling_is_enforced() {
        let (queue, repo) = setup(2);
        let handler = SleepHandler::new(Duration::from_millis(200));
        let started = handler.started_counter();
        queue.register_handler("sleep", Arc::new(handler)).await;

        let mut ids = Vec::new();
        for _ in 0..5 {
            let job = queue
                .create_job(JobSpecBuilder::new("sleep").build())
                .await
                .unwrap();
            ids.push(job.id);
        }

        assert_eq!(queue.poll_once().await.unwrap(), 2);
        assert_eq!(queue.active_count().await, 2);
        assert_eq!(
            queue.list_jobs(Some(JobStatus::Running)).await.unwrap().len(),
            2
        );

        // All slots taken, the next tick dispatches nothing
        assert_eq!(queue.poll_once().await.unwrap(), 0);

        // After the first batch finishes, the next tick refills the slots
        for id in ids.iter().take(2) {
            wait_until_finished(&repo, id, Duration::from_secs(1)).await;
        }
        assert_eq!(queue.poll_once().await.unwrap(), 2);
        assert!(queue.list_jobs(Some(JobStatus::Running)).await.unwrap().len() <= 2);

        for id in ids.iter().skip(2).take(2) {
            wait_until_finished(&repo, id, Duration::from_secs(1)).await;
        }
        assert_eq!(started.load(std::sync::atomic::Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_missing_handler_fails_without_running() {
        let (queue, repo) = setup(2);

        let job = queue
            .create_job(JobSpecBuilder::new("nope").build())
            .await
            .unwrap();

        queue.poll_once().await.unwrap();

        let failed = repo.get(&job.id).await.unwrap().unwrap();
        assert_eq!(failed.status, JobStatus::Failed);
        assert!(failed
            .error
            .as_deref()
            .unwrap()
            .contains("No handler registered"));
        // The job never entered RUNNING and holds no concurrency slot
        assert!(failed.started_at.is_none());
        assert_eq!(queue.active_count().await, 0);
    }

    #[tokio::test]
    async fn test_handler_error_is_captured() {
        let (queue, repo) = setup(2);
        queue
            .register_handler("explode", Arc::new(FailingHandler::new("boom")))
            .await;

        let job = queue
            .create_job(JobSpecBuilder::new("explode").build())
            .await
            .unwrap();

        queue.poll_once().await.unwrap();
        let failed = wait_for_status(&repo, &job.id, JobStatus::Failed, Duration::from_secs(1)).await;

        assert!(failed.error.as_deref().unwrap().contains("boom"));
        assert!(failed.started_at.is_some());
        assert!(failed.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_timeout_wins_over_late_success() {
        let (queue, repo) = setup(2);
        queue
            .register_handler(
                "slow",
                Arc::new(
                    SleepHandler::new(Duration::from_millis(300)).with_result(json!("late result")),
                ),
            )
            .await;

        let job = queue
            .create_job(JobSpecBuilder::new("slow").with_timeout_ms(50).build())
            .await
            .unwrap();

        queue.poll_once().await.unwrap();

        let failed = wait_for_status(&repo, &job.id, JobStatus::Failed, Duration::from_secs(1)).await;
        assert!(failed.error.as_deref().unwrap().contains("timed out"));
        assert_eq!(queue.active_count().await, 0);

        // Let the handler finish; its late success must not flip the state
        tokio::time::sleep(Duration::from_millis(400)).await;
        let still_failed = repo.get(&job.id).await.unwrap().unwrap();
        assert_eq!(still_failed.status, JobStatus::Failed);
        assert!(still_failed.result.is_none());
        assert_eq!(still_failed.completed_at, failed.completed_at);
    }

    #[tokio::test]
    async fn test_cancelled_job_is_never_dispatched() {
        let (queue, repo) = setup(2);
        queue.register_handler("echo", Arc::new(EchoHandler)).await;

        let job = queue
            .create_job(JobSpecBuilder::new("echo").build())
            .await
            .unwrap();
        let cancelled = queue.cancel_job(&job.id).await.unwrap();
        assert_eq!(cancelled.status, JobStatus::Cancelled);

        assert_eq!(queue.poll_once().await.unwrap(), 0);

        let unchanged = repo.get(&job.id).await.unwrap().unwrap();
        assert_eq!(unchanged.status, JobStatus::Cancelled);
        assert!(unchanged.started_at.is_none());
    }

    #[tokio::test]
    async fn test_cancel_is_pending_only() {
        let (queue, repo) = setup(2);
        queue
            .register_handler("sleep", Arc::new(SleepHandler::new(Duration::from_millis(150))))
            .await;

        let job = queue
            .create_job(JobSpecBuilder::new("sleep").build())
            .await
            .unwrap();
        queue.poll_once().await.unwrap();

        // Cancelling a RUNNING job is a no-op that returns it unchanged
        let unchanged = queue.cancel_job(&job.id).await.unwrap();
        assert_eq!(unchanged.status, JobStatus::Running);

        let finished = wait_until_finished(&repo, &job.id, Duration::from_secs(1)).await;
        assert_eq!(finished.status, JobStatus::Completed);

        // Same for a terminal job
        let still_completed = queue.cancel_job(&job.id).await.unwrap();
        assert_eq!(still_completed.status, JobStatus::Completed);
    }

    #[tokio::test]
    async fn test_terminal_state_is_monotonic() {
        let (queue, repo) = setup(2);
        queue.register_handler("echo", Arc::new(EchoHandler)).await;

        let job = queue
            .create_job(JobSpecBuilder::new("echo").build())
            .await
            .unwrap();
        queue.poll_once().await.unwrap();
        let completed =
            wait_for_status(&repo, &job.id, JobStatus::Completed, Duration::from_secs(1)).await;

        // Further ticks and cancel attempts leave the job untouched
        queue.poll_once().await.unwrap();
        queue.cancel_job(&job.id).await.unwrap();
        let after = repo.get(&job.id).await.unwrap().unwrap();
        assert_eq!(after, completed);
    }

    #[tokio::test]
    async fn test_poll_surfaces_store_errors() {
        let queue = JobQueue::new(Arc::new(FailingStore::new()), test_config(2)).unwrap();

        let result = queue.poll_once().await;
        assert!(matches!(result, Err(QueueError::Storage(_))));
    }
}
