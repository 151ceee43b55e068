use crate::storage::models::UploadRecord;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Process-lifetime list of stored uploads, in insertion order.
///
/// Cheap to clone; clones share the same list. Nothing is persisted, so the list starts empty
/// on every start even if the upload directory still holds files.
#[derive(Debug, Clone, Default)]
pub struct UploadRegistry {
    records: Arc<RwLock<Vec<UploadRecord>>>,
}

impl UploadRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append all `records` under a single write lock, so no reader observes half a batch
    pub async fn extend(&self, records: impl IntoIterator<Item = UploadRecord>) {
        self.records.write().await.extend(records);
    }

    /// Snapshot of every record, oldest first
    pub async fn list(&self) -> Vec<UploadRecord> {
        self.records.read().await.clone()
    }
}
