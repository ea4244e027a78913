//! 任务仓储
//!
//! 将通用文档存储端口收敛为面向 Job 实体的类型化访问接口。

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::entities::{Job, JobStatus};
use crate::errors::{QueueError, QueueResult};
use crate::ports::{DocumentFilter, DocumentStore};

/// 任务文档所在的集合名
pub const JOBS_COLLECTION: &str = "jobs";

/// Job 实体的类型化仓储
#[derive(Clone)]
pub struct JobRepository {
    store: Arc<dyn DocumentStore>,
}

impl JobRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    fn to_doc(job: &Job) -> QueueResult<Value> {
        Ok(serde_json::to_value(job)?)
    }

    fn from_doc(doc: Value) -> QueueResult<Job> {
        Ok(serde_json::from_value(doc)?)
    }

    pub async fn insert(&self, job: &Job) -> QueueResult<()> {
        self.store
            .create(JOBS_COLLECTION, Self::to_doc(job)?)
            .await?;
        Ok(())
    }

    pub async fn get(&self, id: &str) -> QueueResult<Option<Job>> {
        match self.store.find_by_id(JOBS_COLLECTION, id).await? {
            Some(doc) => Ok(Some(Self::from_doc(doc)?)),
            None => Ok(None),
        }
    }

    /// 按状态列出任务；不传状态时返回全部
    pub async fn list(&self, status: Option<JobStatus>) -> QueueResult<Vec<Job>> {
        let filter = match status {
            Some(status) => {
                DocumentFilter::new().with_field("status", serde_json::to_value(status)?)
            }
            None => DocumentFilter::new(),
        };
        let docs = self.store.find(JOBS_COLLECTION, &filter).await?;
        let mut jobs = Vec::with_capacity(docs.len());
        for doc in docs {
            match Self::from_doc(doc) {
                Ok(job) => jobs.push(job),
                Err(e) => warn!("跳过无法解析的任务文档: {}", e),
            }
        }
        Ok(jobs)
    }

    /// 全量写回任务文档
    ///
    /// 文档已被清空操作删除时重建，保证执行中任务的终态仍能落盘。
    pub async fn save(&self, job: &Job) -> QueueResult<()> {
        let doc = Self::to_doc(job)?;
        if self
            .store
            .update_by_id(JOBS_COLLECTION, &job.id, doc.clone())
            .await?
            .is_none()
        {
            debug!("任务 {} 的文档不存在，写入时重建", job.id);
            self.store.create(JOBS_COLLECTION, doc).await?;
        }
        Ok(())
    }

    /// 仅更新进度字段；任务不在 RUNNING 状态时忽略
    pub async fn set_progress(&self, id: &str, progress: u8) -> QueueResult<()> {
        let progress = progress.min(100);
        match self.get(id).await? {
            Some(job) if job.is_running() => {
                self.store
                    .update_by_id(JOBS_COLLECTION, id, json!({ "progress": progress }))
                    .await?;
                Ok(())
            }
            Some(_) => Ok(()),
            None => Err(QueueError::job_not_found(id)),
        }
    }

    pub async fn clear(&self) -> QueueResult<u64> {
        self.store.delete_all(JOBS_COLLECTION).await
    }
}

/// 进度上报句柄
///
/// 处理器通过它上报 0-100 的执行进度。上报是尽力而为的：
/// 任务已离开 RUNNING 状态时静默忽略，上报失败只记录日志。
#[derive(Clone)]
pub struct ProgressHandle {
    repo: JobRepository,
    job_id: String,
}

impl ProgressHandle {
    pub fn new(repo: JobRepository, job_id: impl Into<String>) -> Self {
        Self {
            repo,
            job_id: job_id.into(),
        }
    }

    pub async fn set(&self, progress: u8) {
        if let Err(e) = self.repo.set_progress(&self.job_id, progress).await {
            warn!("任务 {} 上报进度失败: {}", self.job_id, e);
        }
    }
}
