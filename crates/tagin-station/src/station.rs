//! The station: registry plus arrival broadcast.
//!
//! [`Station`] is the state shared between the reader loop and the web
//! layer. Every path that changes what the dashboard should show goes
//! through here, so posting to the notifier cannot be forgotten.

use crate::notifier::ArrivalNotifier;
use std::sync::Arc;
use tagin_core::{ArrivalEvent, CardId, MemberUpdate, TapOutcome};
use tagin_storage::{MemberRegistry, StorageResult, UpsertOutcome};
use tracing::{debug, info};

/// Shared station state. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Station {
    registry: Arc<MemberRegistry>,
    notifier: ArrivalNotifier,
}

impl Station {
    pub fn new(registry: Arc<MemberRegistry>, notifier: ArrivalNotifier) -> Self {
        Self { registry, notifier }
    }

    /// Station with a fresh notifier.
    pub fn with_registry(registry: MemberRegistry) -> Self {
        Self::new(Arc::new(registry), ArrivalNotifier::new())
    }

    pub fn registry(&self) -> &MemberRegistry {
        &self.registry
    }

    pub fn notifier(&self) -> &ArrivalNotifier {
        &self.notifier
    }

    /// Announce a card at the reader.
    ///
    /// Known cards post their record; unknown cards post a placeholder so
    /// an administrator can register them from the dashboard.
    pub fn arrive(&self, card_id: &CardId) -> TapOutcome {
        let (member, outcome) = match self.registry.lookup(card_id) {
            Some(member) => (member, TapOutcome::Recognized),
            None => (self.registry.placeholder(card_id), TapOutcome::Unrecognized),
        };

        info!(card_id = %card_id, name = %member.name, %outcome, "Card arrived");
        self.notifier.post(ArrivalEvent::now(member));
        outcome
    }

    /// Apply an administrative edit to `card_id`.
    ///
    /// A committed record is posted so dashboards show the new state; a
    /// rejected edit posts nothing. The post happens before the next edit
    /// can commit, so the latest posted edit is always the stored one.
    ///
    /// # Errors
    ///
    /// Returns the storage error if the record could not be persisted.
    pub async fn update_member(
        &self,
        card_id: &CardId,
        update: MemberUpdate,
    ) -> StorageResult<UpsertOutcome> {
        let notifier = self.notifier.clone();
        let outcome = self
            .registry
            .upsert_then(
                card_id,
                |record| Some(update.apply_to(record)),
                move |record| notifier.post(ArrivalEvent::now(record.clone())),
            )
            .await?;

        if !outcome.is_committed() {
            debug!(card_id = %card_id, "Update not committed, nothing posted");
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tagin_core::{Capability, Permissions};
    use tagin_storage::{RegistryConfig, RejectReason};

    async fn station(dir: &tempfile::TempDir) -> Station {
        let registry = MemberRegistry::open(
            RegistryConfig::new(dir.path().join("tag-users.csv")).create_if_missing(true),
        )
        .await
        .unwrap();
        Station::with_registry(registry)
    }

    fn card(id: &str) -> CardId {
        CardId::new(id).unwrap()
    }

    #[tokio::test]
    async fn test_unknown_card_posts_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let station = station(&dir).await;

        let outcome = station.arrive(&card("AABB0000000000000000"));

        assert_eq!(outcome, TapOutcome::Unrecognized);
        let posted = station.notifier().current().unwrap();
        assert!(posted.member.is_placeholder());
        assert_eq!(posted.member.card_id, card("AABB0000000000000000"));
        assert!(station.registry().is_empty());
    }

    #[tokio::test]
    async fn test_update_posts_committed_record() {
        let dir = tempfile::tempdir().unwrap();
        let station = station(&dir).await;
        let id = card("CCDD0000000000000000");

        let update = MemberUpdate::new("Bob", Permissions::default().with(Capability::Vinyl, true));
        let outcome = station.update_member(&id, update).await.unwrap();

        assert!(matches!(outcome, UpsertOutcome::Inserted(_)));
        let posted = station.notifier().current().unwrap();
        assert_eq!(posted.member.name, "Bob");
        assert!(posted.member.permissions.get(Capability::Vinyl));

        assert_eq!(station.arrive(&id), TapOutcome::Recognized);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_updates_post_the_stored_record() {
        let dir = tempfile::tempdir().unwrap();
        let station = station(&dir).await;
        let id = card("AABB0000000000000000");

        for round in 0..20 {
            let handles: Vec<_> = (0..4)
                .map(|i| {
                    let station = station.clone();
                    let id = id.clone();
                    tokio::spawn(async move {
                        let update =
                            MemberUpdate::new(format!("Member {round}-{i}"), Permissions::default());
                        station.update_member(&id, update).await.unwrap()
                    })
                })
                .collect();
            for handle in handles {
                handle.await.unwrap();
            }

            let shown = station.notifier().current().unwrap();
            assert_eq!(Some(&shown.member), station.registry().lookup(&id).as_ref());
        }
    }

    #[tokio::test]
    async fn test_rejected_update_posts_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let station = station(&dir).await;

        let outcome = station
            .update_member(&card("AABB0000000000000000"), MemberUpdate::default())
            .await
            .unwrap();

        assert_eq!(outcome, UpsertOutcome::Rejected(RejectReason::EmptyName));
        assert!(station.notifier().current().is_none());
    }
}
