//! 处理器注册表
//!
//! 维护任务类型到处理器的映射，查找为 O(1)。注册表在进程启动时由各
//! 业务模块填充，之后调度循环只做只读查找。

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};

use jobq_domain::JobHandler;

pub struct HandlerRegistry {
    handlers: RwLock<HashMap<String, Arc<dyn JobHandler>>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
        }
    }

    /// 注册处理器；同一任务类型重复注册时后注册者生效
    pub async fn register(&self, job_type: impl Into<String>, handler: Arc<dyn JobHandler>) {
        let job_type = job_type.into();
        info!("注册任务处理器: {} -> {}", job_type, handler.name());
        let mut handlers = self.handlers.write().await;
        if handlers.insert(job_type.clone(), handler).is_some() {
            debug!("任务类型 {} 的处理器被覆盖", job_type);
        }
    }

    pub async fn resolve(&self, job_type: &str) -> Option<Arc<dyn JobHandler>> {
        let handlers = self.handlers.read().await;
        handlers.get(job_type).cloned()
    }

    pub async fn contains(&self, job_type: &str) -> bool {
        let handlers = self.handlers.read().await;
        handlers.contains_key(job_type)
    }

    pub async fn count(&self) -> usize {
        let handlers = self.handlers.read().await;
        handlers.len()
    }

    pub async fn job_types(&self) -> Vec<String> {
        let handlers = self.handlers.read().await;
        handlers.keys().cloned().collect()
    }

    pub async fn unregister(&self, job_type: &str) -> bool {
        let mut handlers = self.handlers.write().await;
        handlers.remove(job_type).is_some()
    }

    pub async fn clear(&self) {
        let mut handlers = self.handlers.write().await;
        handlers.clear();
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
