//! Core domain types for the nsnap inventory.
//!
//! A run is one ingestion cycle. Everything written during a cycle shares the
//! same `RunTimestamp`; hosts outlive runs and are identified by `HostId`.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Identifiers ───────────────────────────────────────────────────

/// Stable identity of a host address in the registry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HostId(pub i64);

impl fmt::Display for HostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Point in time (unix seconds) shared by every record of one run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RunTimestamp(pub i64);

impl RunTimestamp {
    /// Convert back to a UTC datetime, if the value is in chrono's range.
    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.0, 0)
    }
}

impl From<DateTime<Utc>> for RunTimestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt.timestamp())
    }
}

impl fmt::Display for RunTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Records ───────────────────────────────────────────────────────

/// A network address known to the registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Host {
    pub id: HostId,
    pub address: String,
    /// Last reported name. `None` until the first rename after `ensure`.
    pub display_name: Option<String>,
}

/// One port as reported by the scanner, before it is tied to a host and run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceRecord {
    pub port: u16,
    pub protocol: String,
    pub state: String,
    pub service_name: Option<String>,
}

/// A persisted `ServiceRecord` for one host in one run. Immutable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceObservation {
    pub host_id: HostId,
    pub run: RunTimestamp,
    pub port: u16,
    pub protocol: String,
    pub state: String,
    pub service_name: Option<String>,
}

/// Changed lines reported for one host between a run and the run before it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiffEntry {
    pub host_id: HostId,
    pub run: RunTimestamp,
    pub diff_text: String,
    pub comment: Option<String>,
}

/// Result of an in-place update that may legitimately match nothing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UpdateOutcome {
    Updated,
    NotFound,
}

impl UpdateOutcome {
    pub fn from_rows(rows: usize) -> Self {
        if rows > 0 {
            Self::Updated
        } else {
            Self::NotFound
        }
    }

    pub fn is_updated(self) -> bool {
        self == Self::Updated
    }
}
