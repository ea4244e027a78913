//! 端口抽象定义
//!
//! 调度引擎依赖的两个外部端口：文档存储（持久层）与任务处理器。
//! 遵循依赖倒置原则，具体实现位于 infrastructure 与各业务模块中。

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::entities::Job;
use crate::errors::QueueResult;
use crate::repositories::ProgressHandle;

/// 等值过滤条件：字段名 -> 期望值
///
/// 空条件匹配集合中的全部文档。
#[derive(Debug, Clone, Default)]
pub struct DocumentFilter {
    fields: HashMap<String, Value>,
}

impl DocumentFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// 文档的每个被过滤字段都与期望值相等时匹配
    pub fn matches(&self, doc: &Value) -> bool {
        self.fields
            .iter()
            .all(|(name, expected)| doc.get(name) == Some(expected))
    }
}

/// 文档存储端口
///
/// 最小化的持久层契约：按集合名与文档 ID 组织的 JSON 文档存储。
/// 只保证单次调用的原子性与 last-write-wins，不提供跨调用事务；
/// 调度循环是任务文档唯一的并发写入方，并自行串行化写操作。
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// 创建文档；缺少 id 字段时自动分配，并补写 created_at/updated_at 时间戳
    async fn create(&self, collection: &str, doc: Value) -> QueueResult<Value>;

    async fn find_by_id(&self, collection: &str, id: &str) -> QueueResult<Option<Value>>;

    /// 等值过滤扫描；空过滤条件返回集合中全部文档
    async fn find(&self, collection: &str, filter: &DocumentFilter) -> QueueResult<Vec<Value>>;

    /// 浅合并 patch 到既有文档并刷新 updated_at；文档不存在时返回 None
    async fn update_by_id(
        &self,
        collection: &str,
        id: &str,
        patch: Value,
    ) -> QueueResult<Option<Value>>;

    async fn delete_by_id(&self, collection: &str, id: &str) -> QueueResult<bool>;

    /// 删除集合中的全部文档，返回删除数量
    async fn delete_all(&self, collection: &str) -> QueueResult<u64>;
}

/// 任务处理器执行上下文
#[derive(Clone)]
pub struct HandlerContext {
    /// 派发时刻的任务快照
    pub job: Job,
    /// 进度上报句柄，处理器可选使用
    pub progress: ProgressHandle,
}

/// 任务处理器端口
///
/// 每种任务类型注册一个处理器。执行成功返回结构化结果，失败返回的
/// 错误描述会被记录到任务的 error 字段；处理器内部不修改任务状态。
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn execute(&self, ctx: HandlerContext) -> QueueResult<Value>;

    /// 处理器名称，用于注册日志与信息展示
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        "Generic job handler"
    }
}
