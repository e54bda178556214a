//! End-to-end station scenarios
//!
//! Drives the orchestrator with the mock tag reader against a real registry
//! and tap log in a temporary directory.
//!
//! Run with: cargo test --package tagin-station --test integration_station

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tagin_core::{CardId, CardUid, Capability, MemberUpdate, Permissions, TapOutcome};
use tagin_hardware::mock::MockTagReader;
use tagin_hardware::{CardReader, HardwareError, Indicator};
use tagin_station::{Station, TapOrchestrator};
use tagin_storage::{
    AuditSink, DailyCsvLog, MemberRegistry, RegistryConfig, RejectReason, UpsertOutcome,
};
use tempfile::TempDir;

const ALICE: &str = "AABB0000000000000000";
const BOB: &str = "CCDD0000000000000000";

#[derive(Default)]
struct RecordingIndicator(Mutex<Vec<TapOutcome>>);

impl Indicator for RecordingIndicator {
    fn trigger(&self, outcome: TapOutcome) {
        self.0.lock().unwrap().push(outcome);
    }
}

impl RecordingIndicator {
    fn seen(&self) -> Vec<TapOutcome> {
        self.0.lock().unwrap().clone()
    }
}

struct Fixture {
    dir: TempDir,
    indicator: Arc<RecordingIndicator>,
    orchestrator: TapOrchestrator<Arc<RecordingIndicator>, DailyCsvLog>,
}

impl Fixture {
    async fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let registry = MemberRegistry::open(
            RegistryConfig::new(dir.path().join("tag-users.csv")).create_if_missing(true),
        )
        .await
        .unwrap();
        let audit = DailyCsvLog::open(dir.path().join("tag-log")).await.unwrap();
        let indicator = Arc::new(RecordingIndicator::default());

        let orchestrator = TapOrchestrator::new(
            Station::with_registry(registry),
            Arc::clone(&indicator),
            audit,
        );

        Self {
            dir,
            indicator,
            orchestrator,
        }
    }

    fn station(&self) -> &Station {
        self.orchestrator.station()
    }

    /// All audit lines written so far, across days.
    fn audit_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for entry in std::fs::read_dir(self.dir.path().join("tag-log")).unwrap() {
            let text = std::fs::read_to_string(entry.unwrap().path()).unwrap();
            lines.extend(text.lines().map(str::to_string));
        }
        lines
    }
}

fn card(id: &str) -> CardId {
    CardId::new(id).unwrap()
}

fn uid(hex: &str) -> CardUid {
    CardUid::from_hex(hex).unwrap()
}

#[tokio::test]
async fn test_unknown_card_then_registration() {
    let fixture = Fixture::new().await;

    // An unregistered card shows up as a placeholder on the dashboard.
    let outcome = fixture.orchestrator.handle_tap(uid("AABB")).await;
    assert_eq!(outcome, Some(TapOutcome::Unrecognized));

    let shown = fixture.station().notifier().current().unwrap();
    assert_eq!(shown.member.card_id, card(ALICE));
    assert!(shown.member.is_placeholder());

    // The administrator registers it from the dashboard.
    let update = MemberUpdate::new(
        "Alice",
        Permissions::default().with(Capability::Laser, true),
    );
    let committed = fixture
        .orchestrator
        .handle_update(&card(ALICE), update)
        .await
        .unwrap();
    assert!(matches!(committed, UpsertOutcome::Inserted(_)));
    assert_eq!(fixture.station().notifier().current().unwrap().member.name, "Alice");

    // The next tap is recognized.
    let outcome = fixture.orchestrator.handle_tap(uid("AABB")).await;
    assert_eq!(outcome, Some(TapOutcome::Recognized));
    assert_eq!(
        fixture.indicator.seen(),
        vec![TapOutcome::Unrecognized, TapOutcome::Recognized]
    );

    let audit = fixture.audit_lines();
    assert_eq!(audit.len(), 2);
    assert!(audit.iter().all(|line| line.ends_with(",AABB0000000000000000")));
}

#[tokio::test]
async fn test_permission_change_is_broadcast() {
    let fixture = Fixture::new().await;
    let bob = card(BOB);

    fixture
        .orchestrator
        .handle_update(&bob, MemberUpdate::new("Bob", Permissions::default()))
        .await
        .unwrap();

    let waiting = fixture.station().notifier().await_next();
    tokio::pin!(waiting);
    assert!(futures::poll!(waiting.as_mut()).is_pending());

    let update = MemberUpdate::new(
        "Bob",
        Permissions::default()
            .with(Capability::Cnc, true)
            .with(Capability::Tablesaw, true),
    );
    let outcome = fixture.orchestrator.handle_update(&bob, update).await.unwrap();
    assert!(matches!(outcome, UpsertOutcome::Updated(_)));

    let seen = waiting.await;
    assert_eq!(seen.member.name, "Bob");
    assert!(seen.member.permissions.get(Capability::Cnc));
    assert!(seen.member.permissions.get(Capability::Tablesaw));
    assert!(!seen.member.permissions.get(Capability::Laser));
}

#[tokio::test]
async fn test_empty_name_is_rejected_and_not_broadcast() {
    let fixture = Fixture::new().await;

    let outcome = fixture
        .orchestrator
        .handle_update(&card(ALICE), MemberUpdate::new("", Permissions::default()))
        .await
        .unwrap();

    assert_eq!(outcome, UpsertOutcome::Rejected(RejectReason::EmptyName));
    assert!(fixture.station().notifier().current().is_none());
    assert!(fixture.station().registry().lookup(&card(ALICE)).is_none());
    assert!(!fixture.dir.path().join("tag-users.csv").exists());
}

#[tokio::test]
async fn test_all_waiters_see_a_tap() {
    let fixture = Fixture::new().await;
    let notifier = fixture.station().notifier().clone();

    const WAITERS: usize = 16;
    let handles: Vec<_> = (0..WAITERS)
        .map(|_| {
            let notifier = notifier.clone();
            tokio::spawn(async move { notifier.await_next().await })
        })
        .collect();
    while notifier.waiters() < WAITERS {
        tokio::task::yield_now().await;
    }

    fixture.orchestrator.handle_tap(uid("CCDD")).await;

    for seen in futures::future::join_all(handles).await {
        assert_eq!(seen.unwrap().member.card_id, card(BOB));
    }
}

#[tokio::test]
async fn test_run_processes_taps_until_device_fails() {
    let fixture = Fixture::new().await;
    let (device, handle) = MockTagReader::new();
    let mut reader = CardReader::new(device.with_scan_window(Duration::from_millis(5)));

    let (error, _) = tokio::join!(fixture.orchestrator.run(&mut reader), async {
        handle.present(vec![0xAA, 0xBB]).await.unwrap();
        // Glitched read: all zeros, must leave no trace.
        handle.present(vec![0x00; 4]).await.unwrap();
        handle.present(vec![0xCC, 0xDD]).await.unwrap();
        handle.fail("USB device vanished").await.unwrap();
    });

    assert!(matches!(error, HardwareError::CommunicationError { .. }));
    assert_eq!(
        fixture.indicator.seen(),
        vec![TapOutcome::Unrecognized, TapOutcome::Unrecognized]
    );
    assert_eq!(
        fixture.station().notifier().current().unwrap().member.card_id,
        card(BOB)
    );

    let audit = fixture.audit_lines();
    assert_eq!(audit.len(), 2);
    assert!(audit[0].ends_with(",AABB0000000000000000"));
    assert!(audit[1].ends_with(",CCDD0000000000000000"));
}

#[tokio::test]
async fn test_audit_sink_through_arc() {
    let dir = TempDir::new().unwrap();
    let audit = Arc::new(DailyCsvLog::open(dir.path()).await.unwrap());

    audit.append(&card(ALICE), chrono::Local::now()).await.unwrap();

    let files: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(files.len(), 1);
}
