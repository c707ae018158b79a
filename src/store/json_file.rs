//! JsonFileStore — the durable record store.
//!
//! All records live in one JSON document:
//!
//! ```text
//! {
//!   "a@x.com": { "status": "pending", "timestamp": "2026-03-01T10:15:30.123Z" }
//! }
//! ```
//!
//! Nothing is cached: every call reads the file, so several server processes
//! pointed at the same path see each other's writes. Read-modify-write cycles
//! are serialised by an in-process mutex and land via write-to-temp + rename,
//! so a reader never observes a half-written document.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::RecordStore;
use crate::models::access::AccessRecord;

type RecordMap = BTreeMap<String, AccessRecord>;

pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<RecordMap> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(RecordMap::new()),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("failed to read {}", self.path.display()))
            }
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(RecordMap::new());
        }

        serde_json::from_slice(&bytes)
            .with_context(|| format!("corrupt record file {}", self.path.display()))
    }

    async fn save(&self, records: &RecordMap) -> Result<()> {
        let json = serde_json::to_vec_pretty(records).context("failed to serialize records")?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let tmp = self
            .path
            .with_extension(format!("tmp-{}", Uuid::new_v4().simple()));
        tokio::fs::write(&tmp, json)
            .await
            .with_context(|| format!("failed to write {}", tmp.display()))?;

        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e).with_context(|| format!("failed to replace {}", self.path.display()));
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for JsonFileStore {
    async fn get(&self, identifier: &str) -> Result<Option<AccessRecord>> {
        let mut records = self.load().await?;
        Ok(records.remove(identifier))
    }

    async fn put(&self, identifier: &str, record: AccessRecord) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.load().await?;
        records.insert(identifier.to_string(), record);
        self.save(&records).await?;
        tracing::debug!(identifier, path = %self.path.display(), "record written");
        Ok(())
    }

    async fn create_if_absent(
        &self,
        identifier: &str,
        record: AccessRecord,
    ) -> Result<Option<AccessRecord>> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.load().await?;
        if let Some(existing) = records.get(identifier) {
            return Ok(Some(existing.clone()));
        }
        records.insert(identifier.to_string(), record);
        self.save(&records).await?;
        tracing::debug!(identifier, path = %self.path.display(), "record created");
        Ok(None)
    }

    async fn list(&self) -> Result<Vec<(String, AccessRecord)>> {
        Ok(self.load().await?.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::access::AccessStatus;
    use chrono::{Duration, Utc};
    use std::sync::Arc;

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("access-gate-{}", Uuid::new_v4().simple()))
            .join(name)
    }

    #[tokio::test]
    async fn test_missing_file_is_empty_store() {
        let store = JsonFileStore::new(scratch_path("users.json"));
        assert!(store.get("nobody@x.com").await.unwrap().is_none());
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let path = scratch_path("users.json");
        let base = Utc::now();

        let mut expected = Vec::new();
        {
            let store = JsonFileStore::new(&path);
            for i in 0..5 {
                let id = format!("user{}@x.com", i);
                let status = match i % 3 {
                    0 => AccessStatus::Pending,
                    1 => AccessStatus::Approved,
                    _ => AccessStatus::Other("on-hold".into()),
                };
                let record = AccessRecord {
                    status,
                    requested_at: base + Duration::milliseconds(i),
                };
                store.put(&id, record.clone()).await.unwrap();
                expected.push((id, record));
            }
        }

        let reopened = JsonFileStore::new(&path);
        assert_eq!(reopened.list().await.unwrap(), expected);
    }

    #[tokio::test]
    async fn test_create_if_absent_keeps_existing() {
        let store = JsonFileStore::new(scratch_path("users.json"));
        let first = AccessRecord::pending(Utc::now());
        assert!(store.create_if_absent("a@x.com", first.clone()).await.unwrap().is_none());

        let second = AccessRecord::pending(Utc::now() + Duration::seconds(5));
        let existing = store.create_if_absent("a@x.com", second).await.unwrap();
        assert_eq!(existing, Some(first.clone()));
        assert_eq!(store.get("a@x.com").await.unwrap(), Some(first));
    }

    #[tokio::test]
    async fn test_concurrent_writes_to_distinct_ids() {
        let store = Arc::new(JsonFileStore::new(scratch_path("users.json")));

        let mut handles = Vec::new();
        for i in 0..20 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .put(&format!("u{}@x.com", i), AccessRecord::pending(Utc::now()))
                    .await
                    .unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        assert_eq!(store.list().await.unwrap().len(), 20);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let path = scratch_path("users.json");
        tokio::fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        tokio::fs::write(&path, b"{ not json").await.unwrap();

        let store = JsonFileStore::new(&path);
        let err = store.get("a@x.com").await.unwrap_err();
        assert!(err.to_string().contains("corrupt record file"));
    }
}
