use thiserror::Error;

use crate::entities::JobStatus;

/// 任务队列统一错误类型
#[derive(Error, Debug, Clone)]
pub enum QueueError {
    #[error("存储操作失败: {0}")]
    Storage(String),
    #[error("数据序列化错误: {0}")]
    Serialization(String),
    #[error("任务不存在: id={id}")]
    JobNotFound { id: String },
    #[error("任务类型没有注册处理器: {job_type}")]
    HandlerNotFound { job_type: String },
    #[error("非法的状态转换: {from:?} -> {to:?}")]
    InvalidTransition { from: JobStatus, to: JobStatus },
    #[error("任务尚未完成: id={id}")]
    ResultNotReady { id: String },
    #[error("配置错误: {0}")]
    Configuration(String),
    #[error("系统内部错误: {0}")]
    Internal(String),
}

pub type QueueResult<T> = Result<T, QueueError>;

impl QueueError {
    pub fn storage_error<S: Into<String>>(msg: S) -> Self {
        Self::Storage(msg.into())
    }
    pub fn job_not_found<S: Into<String>>(id: S) -> Self {
        Self::JobNotFound { id: id.into() }
    }
    pub fn handler_not_found<S: Into<String>>(job_type: S) -> Self {
        Self::HandlerNotFound {
            job_type: job_type.into(),
        }
    }
    pub fn invalid_transition(from: JobStatus, to: JobStatus) -> Self {
        Self::InvalidTransition { from, to }
    }
    pub fn config_error<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }
    pub fn is_not_found(&self) -> bool {
        matches!(self, QueueError::JobNotFound { .. })
    }
}

impl From<serde_json::Error> for QueueError {
    fn from(err: serde_json::Error) -> Self {
        QueueError::Serialization(err.to_string())
    }
}

impl From<anyhow::Error> for QueueError {
    fn from(err: anyhow::Error) -> Self {
        QueueError::Internal(err.to_string())
    }
}
