//! nsnap-core: Shared types for the nsnap scan inventory.
//!
//! This crate provides the domain model used by the store and the scanner:
//! - Host identities and run timestamps
//! - Service observations recorded per run
//! - Diff entries extracted from consecutive scans

pub mod types;

pub use types::{
    DiffEntry, Host, HostId, RunTimestamp, ServiceObservation, ServiceRecord, UpdateOutcome,
};
