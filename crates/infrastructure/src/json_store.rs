//! JSON 文件文档存储
//!
//! 文档存储端口的文件实现：每个集合对应数据目录下的一个 JSON 文件，
//! 首次访问时惰性加载，每次写操作全量重写对应文件。面向单节点的
//! 持久化部署场景，与内存实现共享同一套端口语义。

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Map, Value};
use tokio::sync::RwLock;
use tracing::{debug, info};

use jobq_domain::{DocumentFilter, DocumentStore, QueueError, QueueResult};

type Collection = HashMap<String, Value>;

/// JSON 文件文档存储实现
#[derive(Debug)]
pub struct JsonFileStore {
    data_dir: PathBuf,
    collections: RwLock<HashMap<String, Collection>>,
}

impl JsonFileStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> QueueResult<Self> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir)
            .map_err(|e| QueueError::storage_error(format!("创建数据目录失败: {e}")))?;
        info!("JSON 文件存储已打开: {}", data_dir.display());
        Ok(Self {
            data_dir,
            collections: RwLock::new(HashMap::new()),
        })
    }

    fn collection_path(&self, collection: &str) -> PathBuf {
        self.data_dir.join(format!("{collection}.json"))
    }

    async fn load_from_disk(path: &Path) -> QueueResult<Collection> {
        match tokio::fs::read(path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| QueueError::storage_error(format!("解析集合文件失败: {e}"))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Collection::new()),
            Err(e) => Err(QueueError::storage_error(format!("读取集合文件失败: {e}"))),
        }
    }

    /// 确保集合已加载；调用方必须持有写锁
    async fn ensure_loaded<'a>(
        &self,
        collections: &'a mut HashMap<String, Collection>,
        collection: &str,
    ) -> QueueResult<&'a mut Collection> {
        let path = self.collection_path(collection);
        match collections.entry(collection.to_string()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let loaded = Self::load_from_disk(&path).await?;
                debug!("加载集合 {}，共 {} 个文档", collection, loaded.len());
                Ok(entry.insert(loaded))
            }
        }
    }

    async fn persist(&self, collection: &str, docs: &Collection) -> QueueResult<()> {
        let content = serde_json::to_string_pretty(docs)
            .map_err(|e| QueueError::storage_error(format!("序列化集合失败: {e}")))?;
        tokio::fs::write(self.collection_path(collection), content)
            .await
            .map_err(|e| QueueError::storage_error(format!("写入集合文件失败: {e}")))
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
impl DocumentStore for JsonFileStore {
    async fn create(&self, collection: &str, doc: Value) -> QueueResult<Value> {
        let mut obj = as_object(doc)?;
        let id = prepare_document(&mut obj)?;
        let stored = Value::Object(obj);

        let mut collections = self.collections.write().await;
        let docs = self.ensure_loaded(&mut collections, collection).await?;
        docs.insert(id, stored.clone());
        let snapshot = docs.clone();
        self.persist(collection, &snapshot).await?;
        Ok(stored)
    }

    async fn find_by_id(&self, collection: &str, id: &str) -> QueueResult<Option<Value>> {
        let mut collections = self.collections.write().await;
        let docs = self.ensure_loaded(&mut collections, collection).await?;
        Ok(docs.get(id).cloned())
    }

    async fn find(&self, collection: &str, filter: &DocumentFilter) -> QueueResult<Vec<Value>> {
        let mut collections = self.collections.write().await;
        let docs = self.ensure_loaded(&mut collections, collection).await?;
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
        let docs = self.ensure_loaded(&mut collections, collection).await?;
        let Some(doc) = docs.get_mut(id) else {
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
        let updated = doc.clone();
        let snapshot = docs.clone();
        self.persist(collection, &snapshot).await?;
        Ok(Some(updated))
    }

    async fn delete_by_id(&self, collection: &str, id: &str) -> QueueResult<bool> {
        let mut collections = self.collections.write().await;
        let docs = self.ensure_loaded(&mut collections, collection).await?;
        let removed = docs.remove(id).is_some();
        if removed {
            let snapshot = docs.clone();
            self.persist(collection, &snapshot).await?;
        }
        Ok(removed)
    }

    async fn delete_all(&self, collection: &str) -> QueueResult<u64> {
        let mut collections = self.collections.write().await;
        let docs = self.ensure_loaded(&mut collections, collection).await?;
        let removed = docs.drain().count();
        let snapshot = docs.clone();
        self.persist(collection, &snapshot).await?;
        Ok(removed as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_documents_survive_reopen() {
        let dir = TempDir::new().unwrap();

        {
            let store = JsonFileStore::new(dir.path()).unwrap();
            store
                .create("items", json!({"id": "item-1", "n": 1}))
                .await
                .unwrap();
            store
                .create("items", json!({"id": "item-2", "n": 2}))
                .await
                .unwrap();
        }

        let reopened = JsonFileStore::new(dir.path()).unwrap();
        let all = reopened
            .find("items", &DocumentFilter::new())
            .await
            .unwrap();
        assert_eq!(all.len(), 2);

        let one = reopened.find_by_id("items", "item-1").await.unwrap();
        assert_eq!(one.unwrap()["n"], 1);
    }

    #[tokio::test]
    async fn test_update_persists_to_disk() {
        let dir = TempDir::new().unwrap();

        {
            let store = JsonFileStore::new(dir.path()).unwrap();
            store
                .create("items", json!({"id": "item-1", "n": 1}))
                .await
                .unwrap();
            store
                .update_by_id("items", "item-1", json!({"n": 10}))
                .await
                .unwrap()
                .unwrap();
        }

        let reopened = JsonFileStore::new(dir.path()).unwrap();
        let doc = reopened
            .find_by_id("items", "item-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc["n"], 10);
    }

    #[tokio::test]
    async fn test_delete_all_persists_empty_collection() {
        let dir = TempDir::new().unwrap();

        {
            let store = JsonFileStore::new(dir.path()).unwrap();
            store.create("items", json!({"id": "a"})).await.unwrap();
            store.create("items", json!({"id": "b"})).await.unwrap();
            assert_eq!(store.delete_all("items").await.unwrap(), 2);
        }

        let reopened = JsonFileStore::new(dir.path()).unwrap();
        let all = reopened
            .find("items", &DocumentFilter::new())
            .await
            .unwrap();
        assert!(all.is_empty());
    }

    #[tokio::test]
    async fn test_missing_collection_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path()).unwrap();
        let all = store.find("nothing", &DocumentFilter::new()).await.unwrap();
        assert!(all.is_empty());
        assert!(store.find_by_id("nothing", "x").await.unwrap().is_none());
    }
}
