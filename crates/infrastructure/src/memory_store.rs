//! 内存文档存储
//!
//! 基于 `RwLock<HashMap>` 的文档存储端口实现，按集合名与文档 ID 两级
//! 组织 JSON 文档。适用于测试与嵌入式部署场景，进程退出后数据即丢失。

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Map, Value};
use tokio::sync::RwLock;
use tracing::debug;

use jobq_domain::{DocumentFilter, DocumentStore, QueueError, QueueResult};

type Collection = HashMap<String, Value>;

/// 内存文档存储实现
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前集合中的文档数量，供测试与监控使用
    pub async fn count(&self, collection: &str) -> usize {
        let collections = self.collections.read().await;
        collections.get(collection).map_or(0, Collection::len)
    }
}

fn as_object(doc: Value) -> QueueResult<Map<String, Value>> {
    match doc {
        Value::Object(map) => Ok(map),
        other => Err(QueueError::storage_error(format!(
            "文档必须是 JSON 对象，实际为: {other}"
        ))),
    }
}

/// 补全文档的 id 与时间戳字段，返回文档 ID
fn prepare_document(obj: &mut Map<String, Value>) -> QueueResult<String> {
    let id = match obj.get("id").and_then(Value::as_str) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => {
            let id = uuid::Uuid::new_v4().to_string();
            obj.insert("id".to_string(), json!(id));
            id
        }
    };
    let now = serde_json::to_value(Utc::now())?;
    obj.entry("created_at".to_string()).or_insert(now.clone());
    obj.insert("updated_at".to_string(), now);
    Ok(id)
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn create(&self, collection: &str, doc: Value) -> QueueResult<Value> {
        let mut obj = as_object(doc)?;
        let id = prepare_document(&mut obj)?;
        let stored = Value::Object(obj);

        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), stored.clone());
        debug!("创建文档 {}/{}", collection, id);
        Ok(stored)
    }

    async fn find_by_id(&self, collection: &str, id: &str) -> QueueResult<Option<Value>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    async fn find(&self, collection: &str, filter: &DocumentFilter) -> QueueResult<Vec<Value>> {
        let collections = self.collections.read().await;
        let docs = match collections.get(collection) {
            Some(docs) => docs,
            None => return Ok(Vec::new()),
        };
        Ok(docs
            .values()
            .filter(|doc| filter.matches(doc))
            .cloned()
            .collect())
    }

    async fn update_by_id(
        &self,
        collection: &str,
        id: &str,
        patch: Value,
    ) -> QueueResult<Option<Value>> {
        let patch = as_object(patch)?;

        let mut collections = self.collections.write().await;
        let Some(doc) = collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
        else {
            return Ok(None);
        };
        let Some(obj) = doc.as_object_mut() else {
            return Err(QueueError::storage_error(format!(
                "文档 {collection}/{id} 不是 JSON 对象"
            )));
        };
        for (key, value) in patch {
            obj.insert(key, value);
        }
        obj.insert("updated_at".to_string(), serde_json::to_value(Utc::now())?);
        Ok(Some(doc.clone()))
    }

    async fn delete_by_id(&self, collection: &str, id: &str) -> QueueResult<bool> {
        let mut collections = self.collections.write().await;
        Ok(collections
            .get_mut(collection)
            .is_some_and(|docs| docs.remove(id).is_some()))
    }

    async fn delete_all(&self, collection: &str) -> QueueResult<u64> {
        let mut collections = self.collections.write().await;
        let removed = collections
            .get_mut(collection)
            .map_or(0, |docs| docs.drain().count());
        debug!("清空集合 {}，删除 {} 个文档", collection, removed);
        Ok(removed as u64)
    }
}
