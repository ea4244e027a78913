//! 调度循环
//!
//! 单一周期性循环驱动全部派发决策：每个 tick 计算可用并发槽位、读取
//! PENDING 任务、按优先级排序后派发。处理器在独立的 tokio 任务中执行，
//! 循环本身从不等待处理器完成。
//!
//! `active` 集合是唯一的互斥边界：派发前的状态复查、完成/失败回调、
//! 超时看护与取消操作都在这把锁上串行化，保证并发槽位计数正确，
//! 也保证每个任务只进入一个终态。

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use jobq_domain::{
    HandlerContext, Job, JobHandler, JobRepository, JobStatus, ProgressHandle, QueueResult,
};

use crate::config::QueueConfig;
use crate::registry::HandlerRegistry;

pub struct JobScheduler {
    repo: JobRepository,
    registry: Arc<HandlerRegistry>,
    config: QueueConfig,
    active: Arc<Mutex<HashSet<String>>>,
}

impl JobScheduler {
    pub fn new(repo: JobRepository, registry: Arc<HandlerRegistry>, config: QueueConfig) -> Self {
        Self {
            repo,
            registry,
            config,
            active: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// 当前在执行中的任务数
    pub async fn active_count(&self) -> usize {
        let active = self.active.lock().await;
        active.len()
    }

    /// 执行一次调度决策，返回本轮派发的任务数
    pub async fn poll_once(&self) -> QueueResult<usize> {
        let available = {
            let active = self.active.lock().await;
            self.config.max_concurrent_jobs.saturating_sub(active.len())
        };
        if available == 0 {
            debug!("并发槽位已满，本轮不派发");
            return Ok(0);
        }

        let mut pending = self.repo.list(Some(JobStatus::Pending)).await?;
        if pending.is_empty() {
            return Ok(0);
        }
        // 高优先级先派发，同优先级按创建时间先到先得
        pending.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| a.created_at.cmp(&b.created_at))
        });

        let mut dispatched = 0;
        for job in pending {
            if dispatched >= available {
                break;
            }
            // 防止慢速存储读取与上一轮派发重叠时重复派发同一任务
            if self.active.lock().await.contains(&job.id) {
                continue;
            }
            let job_id = job.id.clone();
            match self.dispatch(job).await {
                Ok(()) => dispatched += 1,
                Err(e) => error!("派发任务 {} 失败: {}", job_id, e),
            }
        }

        if dispatched > 0 {
            debug!("本轮共派发 {} 个任务", dispatched);
        }
        Ok(dispatched)
    }

    async fn dispatch(&self, job: Job) -> QueueResult<()> {
        let Some(handler) = self.registry.resolve(&job.job_type).await else {
            return self.fail_without_running(job).await;
        };

        // 与取消操作在同一把锁上串行化：复查任务仍为 PENDING 后才进入 RUNNING
        let mut active = self.active.lock().await;
        let mut current = match self.repo.get(&job.id).await? {
            Some(current) => current,
            None => {
                debug!("任务 {} 在派发前已被删除，跳过", job.id);
                return Ok(());
            }
        };
        if !current.is_pending() {
            debug!(
                "任务 {} 当前状态 {:?}，不再满足派发条件，跳过",
                current.id, current.status
            );
            return Ok(());
        }
        current.start()?;
        self.repo.save(&current).await?;
        active.insert(current.id.clone());
        drop(active);

        info!("{} 开始执行", current.entity_description());
        self.spawn_handler(current.clone(), handler);
        self.spawn_timeout_watchdog(current.id, current.timeout_ms);
        Ok(())
    }

    /// 派发失败：任务类型没有注册处理器，任务直接进入 FAILED，
    /// 不占用并发槽位，也从不经过 RUNNING 状态
    async fn fail_without_running(&self, mut job: Job) -> QueueResult<()> {
        let message = format!("No handler registered for job type '{}'", job.job_type);
        warn!("任务 {} 派发失败: {}", job.id, message);
        job.fail(message)?;
        self.repo.save(&job).await
    }

    fn spawn_handler(&self, job: Job, handler: Arc<dyn JobHandler>) {
        let repo = self.repo.clone();
        let active = Arc::clone(&self.active);
        let job_id = job.id.clone();
        let dispatched = job.clone();
        let ctx = HandlerContext {
            progress: ProgressHandle::new(repo.clone(), job_id.clone()),
            job,
        };

        tokio::spawn(async move {
            let outcome = handler.execute(ctx).await;

            let mut active = active.lock().await;
            active.remove(&job_id);
            let mut current = match repo.get(&job_id).await {
                Ok(Some(current)) => current,
                // 文档被清空操作删除：以派发时的快照为准写入终态，重建文档
                Ok(None) => dispatched,
                Err(e) => {
                    error!("读取任务 {} 终态前出错: {}", job_id, e);
                    return;
                }
            };
            if !current.is_running() {
                debug!(
                    "任务 {} 已处于 {:?}，迟到的执行结果被丢弃",
                    job_id, current.status
                );
                return;
            }

            let applied = match outcome {
                Ok(result) => current.complete(result),
                Err(e) => current.fail(e.to_string()),
            };
            match applied {
                Ok(()) => {
                    if let Err(e) = repo.save(&current).await {
                        error!("写入任务 {} 终态失败: {}", job_id, e);
                    } else {
                        info!("任务 {} 以 {:?} 结束", job_id, current.status);
                    }
                }
                Err(e) => error!("任务 {} 状态转换异常: {}", job_id, e),
            }
        });
    }

    /// 超时看护：到期后任务仍在执行则标记为 FAILED。
    /// 处理器不会被强制终止，其迟到的结果由完成回调丢弃。
    fn spawn_timeout_watchdog(&self, job_id: String, timeout_ms: i64) {
        let repo = self.repo.clone();
        let active = Arc::clone(&self.active);
        let timeout = Duration::from_millis(timeout_ms.max(0) as u64);

        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;

            let mut active = active.lock().await;
            if !active.remove(&job_id) {
                // 处理器已先行结束
                return;
            }
            match repo.get(&job_id).await {
                Ok(Some(mut job)) if job.is_running() => {
                    let message = format!("Job timed out after {timeout_ms}ms");
                    warn!("任务 {} 执行超时，标记为失败", job_id);
                    match job.fail(message) {
                        Ok(()) => {
                            if let Err(e) = repo.save(&job).await {
                                error!("写入任务 {} 超时终态失败: {}", job_id, e);
                            }
                        }
                        Err(e) => error!("任务 {} 超时状态转换异常: {}", job_id, e),
                    }
                }
                Ok(_) => {}
                Err(e) => error!("超时检查读取任务 {} 失败: {}", job_id, e),
            }
        });
    }

    /// 取消 PENDING 状态的任务
    ///
    /// 与派发在同一把锁上串行化；任务已进入其他状态时原样返回，
    /// 任务不存在时返回 None。
    pub async fn cancel(&self, id: &str) -> QueueResult<Option<Job>> {
        let _guard = self.active.lock().await;

        let Some(mut job) = self.repo.get(id).await? else {
            return Ok(None);
        };
        if !job.is_pending() {
            debug!("任务 {} 状态为 {:?}，取消操作不生效", id, job.status);
            return Ok(Some(job));
        }
        job.cancel()?;
        self.repo.save(&job).await?;
        info!("任务 {} 已取消", id);
        Ok(Some(job))
    }
}
