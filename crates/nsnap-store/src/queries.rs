//! Read operations for the snapshot database.
//!
//! These back both the ingestion cycle (identity resolution) and the
//! read-only viewer surface (hosts, runs, observations, diff history).

use nsnap_core::{DiffEntry, Host, HostId, RunTimestamp, ServiceObservation};
use rusqlite::{params, OptionalExtension, Row};

use crate::client::{SnapshotStore, StoreError};

impl SnapshotStore {
    // ── Host Registry ────────────────────────────────────────────

    /// Look up the identity of an address without creating it.
    pub fn resolve_host(&self, address: &str) -> Result<Option<HostId>, StoreError> {
        let id = self
            .conn
            .query_row(
                "SELECT id FROM hosts WHERE ip = ?1",
                params![address],
                |r| r.get(0),
            )
            .optional()?;
        Ok(id.map(HostId))
    }

    pub fn host(&self, host_id: HostId) -> Result<Option<Host>, StoreError> {
        let host = self
            .conn
            .query_row(
                "SELECT id, ip, name FROM hosts WHERE id = ?1",
                params![host_id.0],
                host_from_row,
            )
            .optional()?;
        Ok(host)
    }

    /// All registered hosts, in order of first sighting.
    pub fn hosts(&self) -> Result<Vec<Host>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, ip, name FROM hosts ORDER BY id")?;
        let rows = stmt.query_map([], host_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    // ── Inventory ────────────────────────────────────────────────

    /// Timestamp of the most recent run that recorded any observation.
    pub fn latest_run(&self) -> Result<Option<RunTimestamp>, StoreError> {
        let latest: Option<i64> =
            self.conn
                .query_row("SELECT MAX(updated) FROM fullscan", [], |r| r.get(0))?;
        Ok(latest.map(RunTimestamp))
    }

    /// Observations recorded in `run`, optionally for a single host.
    pub fn services_for_run(
        &self,
        run: RunTimestamp,
        host_id: Option<HostId>,
    ) -> Result<Vec<ServiceObservation>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, updated, port, protocol, state, service FROM fullscan \
             WHERE updated = ?1 AND (?2 IS NULL OR id = ?2) \
             ORDER BY id, protocol, port",
        )?;
        let rows = stmt.query_map(params![run.0, host_id.map(|h| h.0)], observation_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Distinct run timestamps with observations, newest first.
    pub fn run_timestamps(&self, host_id: Option<HostId>) -> Result<Vec<RunTimestamp>, StoreError> {
        self.distinct_timestamps(
            "SELECT DISTINCT updated FROM fullscan \
             WHERE (?1 IS NULL OR id = ?1) ORDER BY updated DESC",
            host_id,
        )
    }

    // ── Diffs ────────────────────────────────────────────────────

    /// Distinct run timestamps with diff entries, newest first.
    pub fn diff_timestamps(&self, host_id: Option<HostId>) -> Result<Vec<RunTimestamp>, StoreError> {
        self.distinct_timestamps(
            "SELECT DISTINCT updated FROM diffscan \
             WHERE (?1 IS NULL OR id = ?1) ORDER BY updated DESC",
            host_id,
        )
    }

    /// Diff entries of one run, or of every run when `run` is `None`.
    pub fn diffs_for_run(&self, run: Option<RunTimestamp>) -> Result<Vec<DiffEntry>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, updated, diff, comment FROM diffscan \
             WHERE (?1 IS NULL OR updated = ?1) \
             ORDER BY updated DESC, id, rowid",
        )?;
        let rows = stmt.query_map(params![run.map(|r| r.0)], diff_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Every diff entry recorded for a host, newest first.
    pub fn diff_history(&self, host_id: HostId) -> Result<Vec<DiffEntry>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, updated, diff, comment FROM diffscan \
             WHERE id = ?1 ORDER BY updated DESC, rowid",
        )?;
        let rows = stmt.query_map(params![host_id.0], diff_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// The first diff entry stored for `(host_id, run)`.
    pub fn diff_entry(
        &self,
        host_id: HostId,
        run: RunTimestamp,
    ) -> Result<Option<DiffEntry>, StoreError> {
        let entry = self
            .conn
            .query_row(
                "SELECT id, updated, diff, comment FROM diffscan \
                 WHERE id = ?1 AND updated = ?2 ORDER BY rowid LIMIT 1",
                params![host_id.0, run.0],
                diff_from_row,
            )
            .optional()?;
        Ok(entry)
    }

    fn distinct_timestamps(
        &self,
        sql: &str,
        host_id: Option<HostId>,
    ) -> Result<Vec<RunTimestamp>, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params![host_id.map(|h| h.0)], |r| {
            r.get(0).map(RunTimestamp)
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

fn host_from_row(row: &Row<'_>) -> rusqlite::Result<Host> {
    Ok(Host {
        id: HostId(row.get(0)?),
        address: row.get(1)?,
        display_name: row.get(2)?,
    })
}

fn observation_from_row(row: &Row<'_>) -> rusqlite::Result<ServiceObservation> {
    Ok(ServiceObservation {
        host_id: HostId(row.get(0)?),
        run: RunTimestamp(row.get(1)?),
        port: row.get(2)?,
        protocol: row.get(3)?,
        state: row.get(4)?,
        service_name: row.get(5)?,
    })
}

fn diff_from_row(row: &Row<'_>) -> rusqlite::Result<DiffEntry> {
    Ok(DiffEntry {
        host_id: HostId(row.get(0)?),
        run: RunTimestamp(row.get(1)?),
        diff_text: row.get(2)?,
        comment: row.get(3)?,
    })
}
