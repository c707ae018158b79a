//! Record storage for access records.
//!
//! Handlers and the approval state machine only see [`RecordStore`]; the
//! binary binds it to [`json_file::JsonFileStore`] and tests substitute
//! [`memory::MemoryStore`].
//!
//! Two decisions for the same identifier racing each other are
//! last-write-wins. Lazy creation goes through `create_if_absent`, which is
//! atomic within one process.

use async_trait::async_trait;

use crate::models::access::AccessRecord;

pub mod json_file;
pub mod memory;

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Look up the record for `identifier`. Reads always observe the latest
    /// completed `put`.
    async fn get(&self, identifier: &str) -> anyhow::Result<Option<AccessRecord>>;

    /// Insert or overwrite the record for `identifier`.
    async fn put(&self, identifier: &str, record: AccessRecord) -> anyhow::Result<()>;

    /// Insert `record` only if no record exists yet.
    ///
    /// Returns `None` when the record was inserted, or the record that was
    /// already present (which is left untouched).
    async fn create_if_absent(
        &self,
        identifier: &str,
        record: AccessRecord,
    ) -> anyhow::Result<Option<AccessRecord>>;

    /// All records, ordered by identifier.
    async fn list(&self) -> anyhow::Result<Vec<(String, AccessRecord)>>;
}
