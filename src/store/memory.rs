use std::sync::Arc;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::RecordStore;
use crate::models::access::AccessRecord;

/// In-memory record store. Not durable; used by tests and embedders that
/// bring their own persistence.
#[derive(Clone, Default)]
pub struct MemoryStore {
    records: Arc<DashMap<String, AccessRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get(&self, identifier: &str) -> anyhow::Result<Option<AccessRecord>> {
        Ok(self.records.get(identifier).map(|r| r.value().clone()))
    }

    async fn put(&self, identifier: &str, record: AccessRecord) -> anyhow::Result<()> {
        self.records.insert(identifier.to_string(), record);
        Ok(())
    }

    async fn create_if_absent(
        &self,
        identifier: &str,
        record: AccessRecord,
    ) -> anyhow::Result<Option<AccessRecord>> {
        match self.records.entry(identifier.to_string()) {
            Entry::Occupied(existing) => Ok(Some(existing.get().clone())),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(None)
            }
        }
    }

    async fn list(&self) -> anyhow::Result<Vec<(String, AccessRecord)>> {
        let mut all: Vec<_> = self
            .records
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(all)
    }
}
