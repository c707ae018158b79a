use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A persisted access record, keyed externally by the identifier (email).
///
/// `requested_at` is written once when the identifier is first seen and is
/// carried forward unchanged by every later status update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRecord {
    pub status: AccessStatus,
    #[serde(rename = "timestamp")]
    pub requested_at: DateTime<Utc>,
}

impl AccessRecord {
    /// A fresh record as created by the first gate lookup.
    pub fn pending(requested_at: DateTime<Utc>) -> Self {
        Self {
            status: AccessStatus::Pending,
            requested_at,
        }
    }

    /// Returns a copy with `status` replaced and the request time preserved.
    pub fn with_status(&self, status: AccessStatus) -> Self {
        Self {
            status,
            requested_at: self.requested_at,
        }
    }
}

/// Approval status of an identifier.
///
/// Only `approved` releases the payload. Values outside the known set can
/// exist in a hand-edited store file; they round-trip through `Other` and are
/// treated as "not approved".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AccessStatus {
    Pending,
    Approved,
    Rejected,
    Other(String),
}

impl AccessStatus {
    pub fn as_str(&self) -> &str {
        match self {
            AccessStatus::Pending => "pending",
            AccessStatus::Approved => "approved",
            AccessStatus::Rejected => "rejected",
            AccessStatus::Other(s) => s.as_str(),
        }
    }

    /// Parse an operator decision. Only the closed set is accepted here;
    /// `Other` is never produced.
    pub fn parse_decision(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "approved" | "approve" => Some(AccessStatus::Approved),
            "rejected" | "reject" => Some(AccessStatus::Rejected),
            "pending" => Some(AccessStatus::Pending),
            _ => None,
        }
    }

    pub fn is_approved(&self) -> bool {
        matches!(self, AccessStatus::Approved)
    }
}

impl From<String> for AccessStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "pending" => AccessStatus::Pending,
            "approved" => AccessStatus::Approved,
            "rejected" => AccessStatus::Rejected,
            _ => AccessStatus::Other(s),
        }
    }
}

impl From<AccessStatus> for String {
    fn from(status: AccessStatus) -> Self {
        match status {
            AccessStatus::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for AccessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
