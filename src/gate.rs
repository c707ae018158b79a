//! Approval state machine.
//!
//! `evaluate` is the read path clients poll; `decide` is the operator's
//! write path. Neither knows about HTTP.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::models::access::{AccessRecord, AccessStatus};
use crate::store::RecordStore;

/// Source of the protected script released to approved identifiers.
#[async_trait]
pub trait PayloadSource: Send + Sync {
    async fn load(&self) -> anyhow::Result<Bytes>;
}

/// Reads the protected file on every call, so edits take effect without a
/// restart.
pub struct FilePayload {
    path: PathBuf,
}

impl FilePayload {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl PayloadSource for FilePayload {
    async fn load(&self) -> anyhow::Result<Bytes> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("failed to read payload {}", self.path.display()))?;
        Ok(Bytes::from(bytes))
    }
}

/// Fixed in-memory payload.
pub struct StaticPayload(pub Bytes);

#[async_trait]
impl PayloadSource for StaticPayload {
    async fn load(&self) -> anyhow::Result<Bytes> {
        Ok(self.0.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateResult {
    /// First sighting: a pending record was just created.
    Pending,
    /// Approved; carries the full payload.
    Granted(Bytes),
    /// Record exists but is not approved.
    Denied(AccessStatus),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionOutcome {
    Updated,
    /// No record for the identifier; nothing was written.
    UnknownIdentifier,
}

#[derive(Clone)]
pub struct AccessGate {
    store: Arc<dyn RecordStore>,
    payload: Arc<dyn PayloadSource>,
}

impl AccessGate {
    pub fn new(store: Arc<dyn RecordStore>, payload: Arc<dyn PayloadSource>) -> Self {
        Self { store, payload }
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// Decide what a polling client gets for `identifier`.
    ///
    /// Side effect: an unseen identifier gets a `pending` record stamped with
    /// the current time. This is the only write on the read path.
    pub async fn evaluate(&self, identifier: &str) -> anyhow::Result<GateResult> {
        self.evaluate_at(identifier, Utc::now()).await
    }

    pub async fn evaluate_at(
        &self,
        identifier: &str,
        now: DateTime<Utc>,
    ) -> anyhow::Result<GateResult> {
        let record = match self.store.get(identifier).await? {
            Some(record) => record,
            None => {
                match self
                    .store
                    .create_if_absent(identifier, AccessRecord::pending(now))
                    .await?
                {
                    None => {
                        tracing::info!(identifier, "new access request recorded as pending");
                        return Ok(GateResult::Pending);
                    }
                    // Lost a creation race; judge the winner's record.
                    Some(existing) => existing,
                }
            }
        };

        if record.status.is_approved() {
            let payload = self.payload.load().await?;
            tracing::info!(identifier, bytes = payload.len(), "access granted, releasing payload");
            Ok(GateResult::Granted(payload))
        } else {
            tracing::debug!(identifier, status = %record.status, "access denied");
            Ok(GateResult::Denied(record.status))
        }
    }

    /// Apply an operator decision. Unknown identifiers are ignored, so an
    /// identifier cannot be approved before it has polled at least once.
    pub async fn decide(
        &self,
        identifier: &str,
        status: AccessStatus,
    ) -> anyhow::Result<DecisionOutcome> {
        let Some(existing) = self.store.get(identifier).await? else {
            tracing::warn!(identifier, %status, "decision for unknown identifier ignored");
            return Ok(DecisionOutcome::UnknownIdentifier);
        };

        tracing::info!(identifier, from = %existing.status, to = %status, "access decision recorded");
        self.store.put(identifier, existing.with_status(status)).await?;
        Ok(DecisionOutcome::Updated)
    }
}
