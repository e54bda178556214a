//! Reader loop: from a card in the field to feedback, broadcast and audit.
//!
//! For every UID the reader produces, the orchestrator:
//!
//! 1. drops the all-zero UID some readers report for a glitched read,
//! 2. announces the card through the [`Station`],
//! 3. fires the indicator (sound and light),
//! 4. appends the tap to the audit log.
//!
//! Feedback and audit failures never stop the loop. A reader error does:
//! the device is gone, and [`TapOrchestrator::run`] hands the error back so
//! the process can exit and be restarted.

use crate::station::Station;
use chrono::Local;
use tagin_core::{CardUid, MemberUpdate, TapOutcome};
use tagin_hardware::{CardReader, HardwareError, Indicator, TagReader};
use tagin_storage::{AuditSink, StorageResult, UpsertOutcome};
use tracing::{debug, info, warn};

/// Drives taps from a reader through the station.
pub struct TapOrchestrator<I, A> {
    station: Station,
    indicator: I,
    audit: A,
}

impl<I, A> TapOrchestrator<I, A>
where
    I: Indicator,
    A: AuditSink,
{
    pub fn new(station: Station, indicator: I, audit: A) -> Self {
        Self {
            station,
            indicator,
            audit,
        }
    }

    pub fn station(&self) -> &Station {
        &self.station
    }

    /// Process one UID from the reader.
    ///
    /// Returns `None` for the blank UID, which is ignored entirely.
    pub async fn handle_tap(&self, uid: CardUid) -> Option<TapOutcome> {
        if uid.is_blank() {
            debug!("Ignoring blank UID");
            return None;
        }

        let card_id = uid.card_id();
        let outcome = self.station.arrive(&card_id);
        self.indicator.trigger(outcome);

        if let Err(e) = self.audit.append(&card_id, Local::now()).await {
            warn!(card_id = %card_id, "Failed to append tap to audit log: {}", e);
        }
        Some(outcome)
    }

    /// Apply an administrative edit. See [`Station::update_member`].
    ///
    /// # Errors
    ///
    /// Returns the storage error if the record could not be persisted.
    pub async fn handle_update(
        &self,
        card_id: &tagin_core::CardId,
        update: MemberUpdate,
    ) -> StorageResult<UpsertOutcome> {
        self.station.update_member(card_id, update).await
    }

    /// Read cards until the reader fails.
    ///
    /// Only returns with the fatal device error.
    pub async fn run<R: TagReader>(&self, reader: &mut CardReader<R>) -> HardwareError {
        info!("Waiting for cards");
        loop {
            match reader.next_card().await {
                Ok(uid) => {
                    self.handle_tap(uid).await;
                }
                Err(e) => return e,
            }
        }
    }
}
