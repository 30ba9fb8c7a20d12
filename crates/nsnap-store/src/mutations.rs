//! Write operations for the snapshot database.
//!
//! Service observations and diff text are append-only. The only in-place
//! updates are a host's display name and a diff entry's comment.

use nsnap_core::{HostId, RunTimestamp, ServiceRecord, UpdateOutcome};
use rusqlite::params;

use crate::client::{SnapshotStore, StoreError};

/// Outcome of appending one host's services for a run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AppendSummary {
    pub written: usize,
    pub skipped: usize,
}

impl SnapshotStore {
    // ── Host Registry ────────────────────────────────────────────

    /// Return the identity for `address`, creating it on first sighting.
    pub fn ensure_host(&self, address: &str) -> Result<HostId, StoreError> {
        self.conn.execute(
            "INSERT OR IGNORE INTO hosts (ip) VALUES (?1)",
            params![address],
        )?;
        let id = self.conn.query_row(
            "SELECT id FROM hosts WHERE ip = ?1",
            params![address],
            |r| r.get(0),
        )?;
        Ok(HostId(id))
    }

    /// Overwrite the display name of a known address.
    ///
    /// An unknown address is not an error: nothing is written and
    /// `NotFound` is returned.
    pub fn set_host_name(&self, address: &str, name: &str) -> Result<UpdateOutcome, StoreError> {
        let rows = self.conn.execute(
            "UPDATE hosts SET name = ?1 WHERE ip = ?2",
            params![name, address],
        )?;
        let outcome = UpdateOutcome::from_rows(rows);
        if !outcome.is_updated() {
            tracing::warn!(address = %address, name = %name, "Cannot rename unknown host");
        }
        Ok(outcome)
    }

    // ── Inventory ────────────────────────────────────────────────

    /// Record one observation per service for `host_id` under `run`.
    ///
    /// A row the database rejects is logged and skipped; the rest of the
    /// batch is still written.
    pub fn append_run(
        &self,
        run: RunTimestamp,
        host_id: HostId,
        services: &[ServiceRecord],
    ) -> Result<AppendSummary, StoreError> {
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO fullscan (id, updated, port, protocol, state, service) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;

        let mut summary = AppendSummary::default();
        for svc in services {
            let inserted = stmt.execute(params![
                host_id.0,
                run.0,
                svc.port,
                svc.protocol,
                svc.state,
                svc.service_name,
            ]);
            match inserted {
                Ok(_) => summary.written += 1,
                Err(e) => {
                    tracing::warn!(
                        host_id = %host_id,
                        run = %run,
                        port = svc.port,
                        protocol = %svc.protocol,
                        error = %e,
                        "Skipping service observation"
                    );
                    summary.skipped += 1;
                }
            }
        }

        Ok(summary)
    }

    // ── Diffs ────────────────────────────────────────────────────

    /// Append the changed lines reported for `host_id` in `run`.
    ///
    /// Duplicate `(host_id, run)` pairs are accepted.
    pub fn append_diff(
        &self,
        host_id: HostId,
        run: RunTimestamp,
        diff_text: &str,
    ) -> Result<(), StoreError> {
        if diff_text.trim().is_empty() {
            return Err(StoreError::EmptyDiff { host_id, run });
        }
        self.conn.execute(
            "INSERT INTO diffscan (id, updated, diff, comment) VALUES (?1, ?2, ?3, NULL)",
            params![host_id.0, run.0, diff_text],
        )?;
        Ok(())
    }

    /// Attach (or replace) the operator comment on a diff entry.
    pub fn set_comment(
        &self,
        host_id: HostId,
        run: RunTimestamp,
        text: &str,
    ) -> Result<UpdateOutcome, StoreError> {
        let rows = self.conn.execute(
            "UPDATE diffscan SET comment = ?1 WHERE id = ?2 AND updated = ?3",
            params![text, host_id.0, run.0],
        )?;
        Ok(UpdateOutcome::from_rows(rows))
    }
}
