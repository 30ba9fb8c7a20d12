//! nsnap-store: SQLite persistence for scan snapshots.
//!
//! This crate is the single mutation point for the snapshot database.
//! Host identities, per-run service observations, and per-run diff entries
//! are all written through `SnapshotStore`, always with bound parameters.

pub mod client;
pub mod mutations;
pub mod queries;

pub use client::{SnapshotStore, StoreError};
pub use mutations::AppendSummary;
