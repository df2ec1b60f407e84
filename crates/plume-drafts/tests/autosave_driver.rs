use std::sync::Arc;
use std::time::Duration;

use plume_crypto::LocalSigner;
use plume_drafts::{
    AutosaveConfig, AutosaveDriver, DraftContent, DraftCoordinator, SaveMode, SaveStatus,
};
use plume_relay::MemoryRelay;
use plume_store::RecordKind;
use plume_types::{LogicalId, ManualClock, Timestamp};

fn setup() -> (DraftCoordinator, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(Timestamp::from_secs(1_000)));
    let coordinator = DraftCoordinator::new(
        Arc::new(LocalSigner::generate()),
        Arc::new(MemoryRelay::default()),
        clock.clone(),
    );
    (coordinator, clock)
}

fn config() -> AutosaveConfig {
    AutosaveConfig {
        change_threshold: 2,
        min_interval_secs: 3,
        fallback_interval_secs: 30,
        tick_ms: 5,
    }
}

async fn wait_for_versions(coordinator: &DraftCoordinator, id: &LogicalId, n: usize) -> bool {
    for _ in 0..200 {
        if coordinator.history(id).len() >= n {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    false
}

#[tokio::test]
async fn single_edit_waits_for_the_fallback_interval() {
    let (coordinator, clock) = setup();
    let draft = LogicalId::new(coordinator.author(), "essay");
    let driver = AutosaveDriver::start(coordinator.clone(), "essay", SaveMode::Private, config());

    driver.edit(DraftContent::article("first word"));
    clock.advance(4);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(coordinator.history(&draft).is_empty());
    assert_eq!(driver.pending_changes(), 1);

    clock.advance(30);
    assert!(wait_for_versions(&coordinator, &draft, 1).await);
    assert_eq!(driver.pending_changes(), 0);
    assert!(matches!(
        coordinator.status().get(&draft),
        SaveStatus::Saved { .. }
    ));
}

#[tokio::test]
async fn enough_edits_checkpoint_on_top_of_the_last_save() {
    let (coordinator, clock) = setup();
    let draft = LogicalId::new(coordinator.author(), "essay");
    let driver = AutosaveDriver::start(coordinator.clone(), "essay", SaveMode::Private, config());

    driver
        .save_now(DraftContent::article("outline"))
        .await
        .unwrap();

    driver.edit(DraftContent::article("outline + intro"));
    driver.edit(DraftContent::article("outline + intro + body"));
    clock.advance(3);
    assert!(wait_for_versions(&coordinator, &draft, 2).await);

    let history = coordinator.history(&draft);
    assert_eq!(history[0].record.kind, RecordKind::Checkpoint);
    assert_eq!(history[0].document.content, "outline + intro + body");
    assert_eq!(history[0].record.parent, Some(history[1].id()));
}

#[tokio::test]
async fn manual_save_restarts_the_timer() {
    let (coordinator, clock) = setup();
    let draft = LogicalId::new(coordinator.author(), "essay");
    let driver = AutosaveDriver::start(coordinator.clone(), "essay", SaveMode::Private, config());

    driver.edit(DraftContent::article("a"));
    driver.edit(DraftContent::article("ab"));
    driver.save_now(DraftContent::article("ab")).await.unwrap();
    assert_eq!(driver.pending_changes(), 0);

    clock.advance(60);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(coordinator.history(&draft).len(), 1);
}
