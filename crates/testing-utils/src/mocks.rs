//! Mock implementations of the persistence port
//!
//! The real in-memory adapter lives in `jobq-infrastructure`; the mocks
//! here simulate failure modes that adapter never exhibits.

use async_trait::async_trait;
use serde_json::Value;

use jobq_domain::{DocumentFilter, DocumentStore, QueueError, QueueResult};

/// A store whose every operation fails, for exercising loop-level error paths
#[derive(Debug, Default)]
pub struct FailingStore;

impl FailingStore {
    pub fn new() -> Self {
        Self
    }

    fn error() -> QueueError {
        QueueError::storage_error("simulated store outage")
    }
}

#[async_trait]
impl DocumentStore for FailingStore {
    async fn create(&self, _collection: &str, _doc: Value) -> QueueResult<Value> {
        Err(Self::error())
    }

    async fn find_by_id(&self, _collection: &str, _id: &str) -> QueueResult<Option<Value>> {
        Err(Self::error())
    }

    async fn find(&self, _collection: &str, _filter: &DocumentFilter) -> QueueResult<Vec<Value>> {
        Err(Self::error())
    }

    async fn update_by_id(
        &self,
        _collection: &str,
        _id: &str,
        _patch: Value,
    ) -> QueueResult<Option<Value>> {
        Err(Self::error())
    }

    async fn delete_by_id(&self, _collection: &str, _id: &str) -> QueueResult<bool> {
        Err(Self::error())
    }

    async fn delete_all(&self, _collection: &str) -> QueueResult<u64> {
        Err(Self::error())
    }
}
