mod common;

use common::{repo, staged_files, FakeSource, MemoryStore, RecordingNotifier, BUCKET_URL};
use release_mirror::error::{SourceError, SyncError, TransferError};
use release_mirror::synchronise::{FailurePolicy, SyncOrchestrator, SyncOutcome};
use tempfile::tempdir;

#[tokio::test]
async fn scenario_a_both_missing_assets_are_mirrored_and_announced() {
    let staging = tempdir().unwrap();
    let source = FakeSource::new("v1.2.0", &[("a.zip", "alpha-bytes"), ("b.zip", "beta")]);
    let store = MemoryStore::default();
    let notifier = RecordingNotifier::default();

    let report = SyncOrchestrator::new(&source, &store, &notifier, staging.path())
        .run(&repo())
        .await
        .expect("run should succeed");

    assert_eq!(source.download_count(), 2);
    assert_eq!(store.put_count(), 2);
    assert_eq!(notifier.messages().len(), 2);
    assert_eq!(report.mirrored(), 2);
    assert_eq!(staged_files(staging.path()), 0, "no staging residue expected");
    assert_eq!(
        store.objects.lock().unwrap().get("a.zip").map(Vec::as_slice),
        Some(&b"alpha-bytes"[..])
    );
}

#[tokio::test]
async fn scenario_b_present_asset_causes_no_transfer_or_notification() {
    let staging = tempdir().unwrap();
    let source = FakeSource::new("v1.2.0", &[("a.zip", "alpha")]);
    let store = MemoryStore::with_objects(&["a.zip"]);
    let notifier = RecordingNotifier::default();

    let report = SyncOrchestrator::new(&source, &store, &notifier, staging.path())
        .run(&repo())
        .await
        .expect("run should succeed");

    assert_eq!(source.download_count(), 0);
    assert_eq!(store.put_count(), 0);
    assert!(notifier.messages().is_empty());
    assert_eq!(report.assets[0].outcome, SyncOutcome::Skipped);
}

#[tokio::test]
async fn scenario_c_unavailable_store_aborts_before_any_transfer() {
    let staging = tempdir().unwrap();
    let source = FakeSource::new("v1.2.0", &[("a.zip", "alpha"), ("b.zip", "beta")]);
    let store = MemoryStore {
        unavailable: true,
        ..MemoryStore::default()
    };
    let notifier = RecordingNotifier::default();

    let err = SyncOrchestrator::new(&source, &store, &notifier, staging.path())
        .run(&repo())
        .await
        .unwrap_err();

    assert!(
        matches!(err, SyncError::StoreUnavailable { ref asset, .. } if asset == "a.zip"),
        "got {err:?}"
    );
    assert_eq!(source.download_count(), 0);
    assert!(store.names().is_empty(), "destination must be unchanged");
    assert!(notifier.messages().is_empty());
}

#[tokio::test]
async fn scenario_d_download_404_aborts_and_keeps_earlier_mirror() {
    let staging = tempdir().unwrap();
    let source = FakeSource::new("v1.2.0", &[("a.zip", "alpha"), ("b.zip", "beta")])
        .with_missing("b.zip");
    let store = MemoryStore::default();
    let notifier = RecordingNotifier::default();

    let err = SyncOrchestrator::new(&source, &store, &notifier, staging.path())
        .run(&repo())
        .await
        .unwrap_err();

    match err {
        SyncError::Transfer(TransferError::Download { asset, source }) => {
            assert_eq!(asset, "b.zip");
            assert!(matches!(source, SourceError::NotFound { .. }));
        }
        other => panic!("expected download failure, got {other:?}"),
    }
    assert_eq!(store.names(), vec!["a.zip".to_string()]);
    assert_eq!(notifier.messages().len(), 1);
    assert_eq!(staged_files(staging.path()), 0, "no staging residue expected");
}

#[tokio::test]
async fn second_run_over_unchanged_release_skips_everything() {
    let staging = tempdir().unwrap();
    let source = FakeSource::new(
        "v2.0.0",
        &[("a.zip", "alpha"), ("b.zip", "beta"), ("c.tar.gz", "gamma")],
    );
    let store = MemoryStore::default();
    let notifier = RecordingNotifier::default();
    let orchestrator = SyncOrchestrator::new(&source, &store, &notifier, staging.path());

    orchestrator.run(&repo()).await.expect("first run");
    let downloads_after_first = source.download_count();
    let puts_after_first = store.put_count();
    let messages_after_first = notifier.messages().len();

    let second = orchestrator.run(&repo()).await.expect("second run");

    assert_eq!(source.download_count(), downloads_after_first);
    assert_eq!(store.put_count(), puts_after_first);
    assert_eq!(notifier.messages().len(), messages_after_first);
    assert!(second
        .assets
        .iter()
        .all(|a| a.outcome == SyncOutcome::Skipped));
}

#[tokio::test]
async fn every_asset_is_either_preexisting_or_mirrored_after_success() {
    let staging = tempdir().unwrap();
    let source = FakeSource::new(
        "v3.1.0",
        &[("a.zip", "1"), ("b.zip", "22"), ("c.zip", "333"), ("d.zip", "4444")],
    );
    let store = MemoryStore::with_objects(&["b.zip", "d.zip"]);
    let notifier = RecordingNotifier::default();

    let report = SyncOrchestrator::new(&source, &store, &notifier, staging.path())
        .run(&repo())
        .await
        .expect("run should succeed");

    for asset in &report.assets {
        let preexisting = asset.name == "b.zip" || asset.name == "d.zip";
        match &asset.outcome {
            SyncOutcome::Skipped => assert!(preexisting, "{} skipped unexpectedly", asset.name),
            SyncOutcome::Mirrored { .. } => {
                assert!(!preexisting, "{} mirrored twice", asset.name)
            }
            SyncOutcome::Failed { reason } => panic!("{} failed: {reason}", asset.name),
        }
    }
    assert_eq!(store.names().len(), 4);
    assert_eq!(report.mirrored(), 2);
    assert_eq!(report.skipped(), 2);
}

#[tokio::test]
async fn announcement_carries_the_public_object_url() {
    let staging = tempdir().unwrap();
    let source = FakeSource::new("v1.2.0", &[("tool-v1.2.0.tar.gz", "tarball")]);
    let store = MemoryStore::default();
    let notifier = RecordingNotifier::default();

    SyncOrchestrator::new(&source, &store, &notifier, staging.path())
        .run(&repo())
        .await
        .expect("run should succeed");

    assert_eq!(
        notifier.messages(),
        vec![format!("New Release :> {BUCKET_URL}/tool-v1.2.0.tar.gz")]
    );
    assert_eq!(
        notifier.messages()[0],
        "New Release :> https://mybucket.cos.ap-guangzhou.myqcloud.com/tool-v1.2.0.tar.gz"
    );
}

#[tokio::test]
async fn continue_policy_attempts_later_assets_but_still_fails_the_run() {
    let staging = tempdir().unwrap();
    let source = FakeSource::new(
        "v1.2.0",
        &[("a.zip", "alpha"), ("b.zip", "beta"), ("c.zip", "gamma")],
    )
    .with_missing("b.zip");
    let store = MemoryStore::default();
    let notifier = RecordingNotifier::default();

    let err = SyncOrchestrator::new(&source, &store, &notifier, staging.path())
        .with_policy(FailurePolicy::Continue)
        .run(&repo())
        .await
        .unwrap_err();

    match err {
        SyncError::Incomplete { failed, report } => {
            assert_eq!(failed, 1);
            assert_eq!(report.mirrored(), 2);
        }
        other => panic!("expected Incomplete, got {other:?}"),
    }
    assert_eq!(store.names(), vec!["a.zip".to_string(), "c.zip".to_string()]);
    assert_eq!(staged_files(staging.path()), 0);
}
