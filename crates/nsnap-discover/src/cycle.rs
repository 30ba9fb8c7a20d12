//! One ingestion cycle: scan, archive, record the inventory, then diff
//! against the previous scan and record the per-host changes.

use chrono::{DateTime, SubsecRound, Utc};
use nsnap_core::RunTimestamp;
use nsnap_store::SnapshotStore;
use serde::Serialize;
use uuid::Uuid;

use crate::archive::ScanArchive;
use crate::config::ScanProfile;
use crate::error::{DiscoverError, Result};
use crate::inventory::parse_scan_results;
use crate::persist::{self, DiffSummary, InventorySummary};
use crate::scanner::{NdiffRunner, NmapScanner};

/// Everything one cycle did, logged at the end and printed by the CLI.
#[derive(Debug, Clone, Serialize)]
pub struct CycleSummary {
    pub scan_id: Uuid,
    pub run: RunTimestamp,
    pub inventory: InventorySummary,
    /// `None` on the first scan, when there is nothing to compare against.
    pub diff: Option<DiffSummary>,
    pub duration_ms: u128,
}

/// External tools used by a cycle.
pub struct Tools<'a> {
    pub nmap: &'a NmapScanner,
    pub ndiff: &'a NdiffRunner,
}

/// Execute a single cycle: nmap -> archive -> inventory -> ndiff -> diffs.
///
/// Scanning and archiving failures abort the cycle before anything is
/// written. A failing ndiff aborts it after the inventory is committed.
pub async fn run_cycle(
    tools: Tools<'_>,
    store: &SnapshotStore,
    archive: &ScanArchive,
    targets: &[String],
    profile: &ScanProfile,
    extra_args: &[String],
) -> Result<CycleSummary> {
    if targets.is_empty() {
        return Err(DiscoverError::Config(
            "No scan targets: pass --target or set discover.targets".to_string(),
        ));
    }

    // One timestamp names the archive files and every record of the run.
    let started: DateTime<Utc> = Utc::now().trunc_subsecs(0);
    let run = RunTimestamp::from(started);

    let scan = tools.nmap.scan(targets, profile, extra_args).await?;
    let current = archive.write_scan(started, &scan.xml)?;
    tracing::info!(scan_id = %scan.scan_id, path = %current.display(), "Scan archived");

    let inventory = parse_scan_results(&scan.nmap_run);
    let inventory = persist::persist_inventory(store, run, &inventory)?;

    let diff = match archive.previous() {
        None => {
            tracing::warn!("No previous scan found, assuming this is the first one");
            promote(archive, &current);
            None
        }
        Some(previous) => {
            let report = tools.ndiff.compare(&previous, &current).await?;
            let path = archive.write_diff(started, &report.text)?;
            tracing::info!(path = %path.display(), outcome = ?report.outcome(), "Diff archived");
            promote(archive, &current);
            Some(persist::persist_diffs(store, run, &report)?)
        }
    };

    let summary = CycleSummary {
        scan_id: scan.scan_id,
        run,
        inventory,
        diff,
        duration_ms: scan.duration.as_millis(),
    };

    tracing::info!(
        scan_id = %summary.scan_id,
        run = %summary.run,
        hosts = summary.inventory.hosts_recorded,
        observations = summary.inventory.observations_written,
        hosts_changed = summary.diff.as_ref().map_or(0, |d| d.hosts_changed),
        duration_ms = summary.duration_ms,
        "Cycle complete"
    );

    Ok(summary)
}

fn promote(archive: &ScanArchive, current: &std::path::Path) {
    if let Err(e) = archive.promote(current) {
        tracing::warn!(path = %current.display(), error = %e, "Failed to update last scan link");
    }
}
