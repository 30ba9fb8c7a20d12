//! Store persistence: record a run's inventory and its per-host diffs.

use nsnap_core::RunTimestamp;
use nsnap_store::SnapshotStore;
use serde::Serialize;

use crate::diff::{split_blocks, DiffBlock};
use crate::error::{DiscoverError, Result};
use crate::inventory::{ScanInventory, ScannedHost};
use crate::scanner::{DiffOutcome, NdiffReport};

#[derive(Debug, Default, Clone, Serialize)]
pub struct InventorySummary {
    pub hosts_recorded: usize,
    /// Hosts dropped by the parser (no ports) or by the registry.
    pub hosts_skipped: usize,
    pub observations_written: usize,
    pub observations_skipped: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiffSummary {
    pub outcome: DiffOutcome,
    pub hosts_changed: usize,
    pub orphans: usize,
}

/// Persist every scanned host under `run` and commit.
///
/// Per host: ensure its identity, overwrite its display name, then append
/// its services. A host the registry rejects is logged and skipped.
pub fn persist_inventory(
    store: &SnapshotStore,
    run: RunTimestamp,
    inventory: &ScanInventory,
) -> Result<InventorySummary> {
    let mut summary = InventorySummary {
        hosts_skipped: inventory.skipped_hosts,
        ..Default::default()
    };

    let tx = store.begin()?;
    for host in &inventory.hosts {
        match persist_host(store, run, host) {
            Ok(appended) => {
                summary.hosts_recorded += 1;
                summary.observations_written += appended.written;
                summary.observations_skipped += appended.skipped;
            }
            Err(e) => {
                tracing::warn!(address = %host.address, error = %e, "Skipping host");
                summary.hosts_skipped += 1;
            }
        }
    }
    tx.commit().map_err(nsnap_store::StoreError::from)?;

    tracing::info!(
        run = %run,
        hosts = summary.hosts_recorded,
        skipped = summary.hosts_skipped,
        observations = summary.observations_written,
        "Inventory recorded"
    );
    Ok(summary)
}

fn persist_host(
    store: &SnapshotStore,
    run: RunTimestamp,
    host: &ScannedHost,
) -> Result<nsnap_store::AppendSummary> {
    let host_id = store.ensure_host(&host.address)?;
    store.set_host_name(&host.address, &host.display_name)?;
    tracing::debug!(
        address = %host.address,
        name = %host.display_name,
        host_id = %host_id,
        services = host.services.len(),
        "Recording host"
    );
    Ok(store.append_run(run, host_id, &host.services)?)
}

/// Act on an ndiff report for `run`.
///
/// * no differences: nothing is written.
/// * differences: blocks are extracted and stored in one transaction.
/// * failure: an error is returned and nothing is written.
pub fn persist_diffs(
    store: &SnapshotStore,
    run: RunTimestamp,
    report: &NdiffReport,
) -> Result<DiffSummary> {
    match report.outcome() {
        DiffOutcome::NoDifferences => {
            tracing::info!(run = %run, "No differences detected");
            Ok(DiffSummary {
                outcome: DiffOutcome::NoDifferences,
                hosts_changed: 0,
                orphans: 0,
            })
        }
        DiffOutcome::Failed => Err(DiscoverError::NdiffFailed {
            code: report.exit_code.unwrap_or(-1),
            stderr: report.stderr.trim().to_string(),
        }),
        DiffOutcome::Differences => {
            let blocks = split_blocks(&report.text);
            let summary = store_blocks(store, run, &blocks)?;
            tracing::info!(
                run = %run,
                hosts_changed = summary.hosts_changed,
                orphans = summary.orphans,
                "Diffs recorded"
            );
            Ok(summary)
        }
    }
}

/// Resolve each block's host and append its diff. Blocks naming an unknown
/// address are dropped. Commits only once every block has been handled.
pub fn store_blocks(
    store: &SnapshotStore,
    run: RunTimestamp,
    blocks: &[DiffBlock],
) -> Result<DiffSummary> {
    let mut summary = DiffSummary {
        outcome: DiffOutcome::Differences,
        hosts_changed: 0,
        orphans: 0,
    };

    let tx = store.begin()?;
    for block in blocks {
        match store.resolve_host(&block.address)? {
            Some(host_id) => {
                tracing::info!(address = %block.address, host_id = %host_id, "Updating diff");
                store.append_diff(host_id, run, &block.text)?;
                summary.hosts_changed += 1;
            }
            None => {
                tracing::warn!(address = %block.address, "Host not found, dropping orphan diff");
                summary.orphans += 1;
            }
        }
    }
    tx.commit().map_err(nsnap_store::StoreError::from)?;

    Ok(summary)
}
