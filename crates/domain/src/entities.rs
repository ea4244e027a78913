use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::errors::{QueueError, QueueResult};

/// 任务生命周期状态
///
/// 状态转换是单向的：PENDING -> RUNNING -> {COMPLETED, FAILED}，
/// 以及 PENDING -> CANCELLED / PENDING -> FAILED（派发失败）。
/// 终止状态一旦写入不允许再变更。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum JobStatus {
    #[serde(rename = "PENDING")]
    Pending,
    #[serde(rename = "RUNNING")]
    Running,
    #[serde(rename = "COMPLETED")]
    Completed,
    #[serde(rename = "FAILED")]
    Failed,
    #[serde(rename = "CANCELLED")]
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

/// 任务优先级
///
/// 数值越大优先级越高，同一轮调度内高优先级先派发。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum JobPriority {
    #[serde(rename = "LOW")]
    Low,
    #[serde(rename = "NORMAL")]
    Normal,
    #[serde(rename = "HIGH")]
    High,
    #[serde(rename = "CRITICAL")]
    Critical,
}

impl JobPriority {
    pub fn as_i32(&self) -> i32 {
        match self {
            JobPriority::Low => 0,
            JobPriority::Normal => 1,
            JobPriority::High => 2,
            JobPriority::Critical => 3,
        }
    }
}

impl Default for JobPriority {
    fn default() -> Self {
        JobPriority::Normal
    }
}

/// 创建任务的输入参数
///
/// 创建时不校验 job_type 是否已注册处理器，缺失在派发时才被发现。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSpec {
    pub name: String,
    pub job_type: String,
    #[serde(default)]
    pub priority: JobPriority,
    #[serde(default)]
    pub payload: Value,
    /// 超时（毫秒），缺省时使用队列配置中的默认值
    pub timeout_ms: Option<i64>,
    /// 调用方附加的元数据，引擎不解释其内容
    pub metadata: Option<Value>,
}

impl JobSpec {
    pub fn new(name: impl Into<String>, job_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            job_type: job_type.into(),
            priority: JobPriority::default(),
            payload: Value::Null,
            timeout_ms: None,
            metadata: None,
        }
    }

    pub fn with_priority(mut self, priority: JobPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: i64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// 一次异步任务的完整记录
///
/// 身份字段（id/name/job_type/priority/payload/metadata）创建后不可变；
/// 生命周期字段只通过显式的状态转换方法修改。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Job {
    pub id: String,
    pub name: String,
    pub job_type: String,
    pub status: JobStatus,
    pub priority: JobPriority,
    pub payload: Value,
    pub result: Option<Value>,
    pub error: Option<String>,
    /// 执行进度 0-100，仅在 RUNNING 状态下有意义
    pub progress: u8,
    pub timeout_ms: i64,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub metadata: Option<Value>,
}

impl Job {
    pub fn new(spec: JobSpec, default_timeout_ms: i64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: spec.name,
            job_type: spec.job_type,
            status: JobStatus::Pending,
            priority: spec.priority,
            payload: spec.payload,
            result: None,
            error: None,
            progress: 0,
            timeout_ms: spec.timeout_ms.unwrap_or(default_timeout_ms),
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            metadata: spec.metadata,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.status, JobStatus::Pending)
    }

    pub fn is_running(&self) -> bool {
        matches!(self.status, JobStatus::Running)
    }

    pub fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }

    /// PENDING -> RUNNING，记录开始时间
    pub fn start(&mut self) -> QueueResult<()> {
        if self.status != JobStatus::Pending {
            return Err(QueueError::invalid_transition(self.status, JobStatus::Running));
        }
        self.status = JobStatus::Running;
        self.started_at = Some(Utc::now());
        Ok(())
    }

    /// RUNNING -> COMPLETED，写入执行结果
    pub fn complete(&mut self, result: Value) -> QueueResult<()> {
        if self.status != JobStatus::Running {
            return Err(QueueError::invalid_transition(
                self.status,
                JobStatus::Completed,
            ));
        }
        self.status = JobStatus::Completed;
        self.result = Some(result);
        self.progress = 100;
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    /// PENDING/RUNNING -> FAILED，写入错误描述
    ///
    /// PENDING 直接失败对应派发失败（任务类型没有注册处理器）。
    pub fn fail(&mut self, error: impl Into<String>) -> QueueResult<()> {
        if self.status != JobStatus::Pending && self.status != JobStatus::Running {
            return Err(QueueError::invalid_transition(self.status, JobStatus::Failed));
        }
        self.status = JobStatus::Failed;
        self.error = Some(error.into());
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    /// PENDING -> CANCELLED
    pub fn cancel(&mut self) -> QueueResult<()> {
        if self.status != JobStatus::Pending {
            return Err(QueueError::invalid_transition(
                self.status,
                JobStatus::Cancelled,
            ));
        }
        self.status = JobStatus::Cancelled;
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    pub fn status_snapshot(&self) -> JobStatusSnapshot {
        JobStatusSnapshot {
            id: self.id.clone(),
            status: self.status,
            progress: self.progress,
            created_at: self.created_at,
            started_at: self.started_at,
            completed_at: self.completed_at,
            error: self.error.clone(),
        }
    }

    pub fn entity_description(&self) -> String {
        format!(
            "任务 '{}' (ID: {}, 类型: {})",
            self.name, self.id, self.job_type
        )
    }
}

/// 状态查询视图
///
/// 轮询接口返回的只读切面，不携带 payload 与 result。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobStatusSnapshot {
    pub id: String,
    pub status: JobStatus,
    pub progress: u8,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}
