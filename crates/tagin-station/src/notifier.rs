//! Latest-arrival broadcast.
//!
//! The notifier holds a single slot with the most recent [`ArrivalEvent`].
//! Posting replaces the slot and wakes every waiter; waiters that were slow
//! to resume see the newest event, not a backlog. Memory use is one event no
//! matter how many dashboards are long-polling.
//!
//! # Examples
//!
//! ```
//! use tagin_core::{ArrivalEvent, CardId, MemberRecord};
//! use tagin_station::ArrivalNotifier;
//!
//! #[tokio::main]
//! async fn main() {
//!     let notifier = ArrivalNotifier::new();
//!     assert!(notifier.current().is_none());
//!
//!     let waiter = notifier.clone();
//!     let pending = tokio::spawn(async move { waiter.await_next().await });
//!     while notifier.waiters() == 0 {
//!         tokio::task::yield_now().await;
//!     }
//!
//!     let card = CardId::new("AABB0000000000000000").unwrap();
//!     notifier.post(ArrivalEvent::now(MemberRecord::placeholder(card)));
//!
//!     let seen = pending.await.unwrap();
//!     assert_eq!(seen.member.card_id.as_str(), "AABB0000000000000000");
//! }
//! ```

use std::sync::Arc;
use tagin_core::ArrivalEvent;
use tokio::sync::watch;
use tracing::trace;

/// Single-slot broadcast of the latest arrival. Clones share the slot.
#[derive(Debug, Clone)]
pub struct ArrivalNotifier {
    slot: Arc<watch::Sender<Option<Arc<ArrivalEvent>>>>,
}

impl Default for ArrivalNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ArrivalNotifier {
    /// Create a notifier with an empty slot.
    pub fn new() -> Self {
        let (slot, _) = watch::channel(None);
        Self {
            slot: Arc::new(slot),
        }
    }

    /// Publish `event` to every current waiter. Never blocks.
    pub fn post(&self, event: ArrivalEvent) {
        trace!(card_id = %event.member.card_id, "Posting arrival");
        self.slot.send_replace(Some(Arc::new(event)));
    }

    /// The most recent event, if any has been posted.
    pub fn current(&self) -> Option<Arc<ArrivalEvent>> {
        self.slot.borrow().clone()
    }

    /// Wait for the next event posted after this call starts.
    ///
    /// Events posted before the call are not returned, even if no one has
    /// seen them yet.
    pub async fn await_next(&self) -> Arc<ArrivalEvent> {
        let mut rx = self.slot.subscribe();
        loop {
            if rx.changed().await.is_err() {
                // Unreachable while `self` holds the sender.
                return std::future::pending().await;
            }
            if let Some(event) = rx.borrow_and_update().clone() {
                return event;
            }
        }
    }

    /// Number of tasks currently waiting in [`await_next`](Self::await_next).
    pub fn waiters(&self) -> usize {
        self.slot.receiver_count()
    }
}
