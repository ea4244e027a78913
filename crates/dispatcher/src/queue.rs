//! 任务队列门面
//!
//! 对请求层暴露的统一入口：创建 / 查询 / 取消 / 列表 / 清空，
//! 以及调度循环的启动与停止。内部持有注册表、仓储与调度器，
//! 按引用共享给所有调用方，不依赖任何全局可变状态。

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use jobq_domain::{
    DocumentStore, Job, JobHandler, JobRepository, JobSpec, JobStatus, JobStatusSnapshot,
    QueueError, QueueResult,
};

use crate::config::QueueConfig;
use crate::registry::HandlerRegistry;
use crate::scheduler::JobScheduler;

struct SchedulerLoop {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

pub struct JobQueue {
    repo: JobRepository,
    registry: Arc<HandlerRegistry>,
    scheduler: Arc<JobScheduler>,
    config: QueueConfig,
    scheduler_loop: Mutex<Option<SchedulerLoop>>,
}

impl JobQueue {
    pub fn new(store: Arc<dyn DocumentStore>, config: QueueConfig) -> QueueResult<Self> {
        config.validate()?;
        let repo = JobRepository::new(store);
        let registry = Arc::new(HandlerRegistry::new());
        let scheduler = Arc::new(JobScheduler::new(
            repo.clone(),
            Arc::clone(&registry),
            config.clone(),
        ));
        Ok(Self {
            repo,
            registry,
            scheduler,
            config,
            scheduler_loop: Mutex::new(None),
        })
    }

    /// 注册任务类型的处理器，通常由各业务模块在进程启动时调用
    pub async fn register_handler(&self, job_type: impl Into<String>, handler: Arc<dyn JobHandler>) {
        self.registry.register(job_type, handler).await;
    }

    /// 创建任务并持久化为 PENDING
    ///
    /// 创建时不要求处理器已注册，缺失在派发时才被发现。
    pub async fn create_job(&self, spec: JobSpec) -> QueueResult<Job> {
        let job = Job::new(spec, self.config.default_timeout_ms);
        self.repo.insert(&job).await?;
        info!("{} 已入队", job.entity_description());
        Ok(job)
    }

    pub async fn get_job(&self, id: &str) -> QueueResult<Job> {
        self.repo
            .get(id)
            .await?
            .ok_or_else(|| QueueError::job_not_found(id))
    }

    pub async fn get_job_status(&self, id: &str) -> QueueResult<JobStatusSnapshot> {
        Ok(self.get_job(id).await?.status_snapshot())
    }

    /// 获取 COMPLETED 任务的执行结果
    pub async fn get_job_result(&self, id: &str) -> QueueResult<Value> {
        let job = self.get_job(id).await?;
        if job.status != JobStatus::Completed {
            return Err(QueueError::ResultNotReady { id: id.to_string() });
        }
        Ok(job.result.unwrap_or(Value::Null))
    }

    /// 取消任务；只有 PENDING 任务会转入 CANCELLED，其余状态原样返回
    pub async fn cancel_job(&self, id: &str) -> QueueResult<Job> {
        self.scheduler
            .cancel(id)
            .await?
            .ok_or_else(|| QueueError::job_not_found(id))
    }

    /// 按状态列出任务，按创建时间升序排列
    pub async fn list_jobs(&self, status: Option<JobStatus>) -> QueueResult<Vec<Job>> {
        let mut jobs = self.repo.list(status).await?;
        jobs.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(jobs)
    }

    /// 清空全部已持久化任务（管理操作）
    ///
    /// 仍在执行中的任务不受影响，完成后会重建各自的文档写入终态。
    pub async fn clear_jobs(&self) -> QueueResult<u64> {
        let removed = self.repo.clear().await?;
        info!("已清空任务集合，删除 {} 个任务", removed);
        Ok(removed)
    }

    /// 当前在执行中的任务数
    pub async fn active_count(&self) -> usize {
        self.scheduler.active_count().await
    }

    /// 手动执行一次调度决策，供测试与嵌入式调用方使用
    pub async fn poll_once(&self) -> QueueResult<usize> {
        self.scheduler.poll_once().await
    }

    /// 启动调度循环；重复调用是幂等的
    pub async fn start(&self) {
        let mut slot = self.scheduler_loop.lock().await;
        if slot.is_some() {
            debug!("调度循环已在运行，忽略重复启动");
            return;
        }

        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let scheduler = Arc::clone(&self.scheduler);
        let interval_ms = self.config.poll_interval_ms;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        // 单次调度出错只记录日志，循环在下个周期重试
                        if let Err(e) = scheduler.poll_once().await {
                            error!("调度循环执行出错: {}", e);
                        }
                    }
                }
            }
            info!("调度循环已退出");
        });

        *slot = Some(SchedulerLoop { shutdown, handle });
        info!("调度循环已启动，轮询间隔 {}ms", interval_ms);
    }

    /// 停止调度循环；未启动时调用无效果
    pub async fn stop(&self) {
        let running = {
            let mut slot = self.scheduler_loop.lock().await;
            slot.take()
        };
        let Some(running) = running else {
            debug!("调度循环未在运行，忽略停止请求");
            return;
        };
        if running.shutdown.send(true).is_err() {
            running.handle.abort();
            return;
        }
        let _ = running.handle.await;
        info!("调度循环已停止");
    }
}
