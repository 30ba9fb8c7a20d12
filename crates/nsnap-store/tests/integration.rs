//! Integration tests for nsnap-store against an on-disk database.

use nsnap_core::{RunTimestamp, ServiceRecord, UpdateOutcome};
use nsnap_store::{SnapshotStore, StoreError};

fn ssh() -> ServiceRecord {
    ServiceRecord {
        port: 22,
        protocol: "tcp".to_string(),
        state: "open".to_string(),
        service_name: Some("ssh".to_string()),
    }
}

#[test]
fn test_identity_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state").join("nsnap.sqlite3");

    let id = {
        let store = SnapshotStore::open(&path).unwrap();
        store.ensure_host("10.0.1.1").unwrap()
    };

    let store = SnapshotStore::open(&path).unwrap();
    assert_eq!(store.resolve_host("10.0.1.1").unwrap(), Some(id));
    assert_eq!(store.ensure_host("10.0.1.1").unwrap(), id);
    assert_eq!(store.hosts().unwrap().len(), 1);
}

#[test]
fn test_runs_are_appended_not_replaced() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nsnap.sqlite3");
    let store = SnapshotStore::open(&path).unwrap();

    let id = store.ensure_host("10.0.1.1").unwrap();
    store.append_run(RunTimestamp(1_000), id, &[ssh()]).unwrap();
    store.append_run(RunTimestamp(2_000), id, &[ssh()]).unwrap();
    drop(store);

    let store = SnapshotStore::open(&path).unwrap();
    assert_eq!(store.latest_run().unwrap(), Some(RunTimestamp(2_000)));
    assert_eq!(store.services_for_run(RunTimestamp(1_000), None).unwrap().len(), 1);
    assert_eq!(store.services_for_run(RunTimestamp(2_000), None).unwrap().len(), 1);
}

#[test]
fn test_uncommitted_diffs_are_discarded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nsnap.sqlite3");
    let store = SnapshotStore::open(&path).unwrap();
    let id = store.ensure_host("10.0.1.1").unwrap();

    {
        let _tx = store.begin().unwrap();
        store
            .append_diff(id, RunTimestamp(1_000), "+80/tcp open http\n")
            .unwrap();
    }
    assert!(store.diffs_for_run(None).unwrap().is_empty());

    let tx = store.begin().unwrap();
    store
        .append_diff(id, RunTimestamp(1_000), "+80/tcp open http\n")
        .unwrap();
    tx.commit().unwrap();
    drop(store);

    let store = SnapshotStore::open(&path).unwrap();
    assert_eq!(store.diffs_for_run(Some(RunTimestamp(1_000))).unwrap().len(), 1);
}

#[test]
fn test_comment_round_trip_and_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let store = SnapshotStore::open(dir.path().join("nsnap.sqlite3")).unwrap();
    let id = store.ensure_host("10.0.1.1").unwrap();
    store
        .append_diff(id, RunTimestamp(1_000), "-22/tcp open ssh\n")
        .unwrap();

    assert_eq!(
        store.set_comment(id, RunTimestamp(1_000), "decommissioned").unwrap(),
        UpdateOutcome::Updated
    );
    assert_eq!(
        store.set_comment(id, RunTimestamp(5_000), "nothing here").unwrap(),
        UpdateOutcome::NotFound
    );

    let entry = store.diff_entry(id, RunTimestamp(1_000)).unwrap().unwrap();
    assert_eq!(entry.comment.as_deref(), Some("decommissioned"));
    assert_eq!(entry.diff_text, "-22/tcp open ssh\n");
}

#[test]
fn test_empty_diff_is_a_contract_violation() {
    let store = SnapshotStore::open_in_memory().unwrap();
    let id = store.ensure_host("10.0.1.1").unwrap();
    match store.append_diff(id, RunTimestamp(1), "   \n") {
        Err(StoreError::EmptyDiff { host_id, run }) => {
            assert_eq!(host_id, id);
            assert_eq!(run, RunTimestamp(1));
        }
        other => panic!("expected EmptyDiff, got {other:?}"),
    }
}
