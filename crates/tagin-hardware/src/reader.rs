//! Blocking card reader built on a [`TagReader`] device.
//!
//! [`CardReader::next_card`] turns the device's one-shot polling primitive
//! into "wait for the next card". Every poll attempt, whether it found a tag
//! or not, kicks the watchdog: the watchdog measures whether the hardware
//! still answers, not whether anybody is tapping.
//!
//! # Examples
//!
//! ```
//! use tagin_hardware::mock::MockTagReader;
//! use tagin_hardware::reader::CardReader;
//!
//! #[tokio::main]
//! async fn main() -> tagin_hardware::Result<()> {
//!     let (device, handle) = MockTagReader::new();
//!     let mut reader = CardReader::new(device);
//!
//!     handle.present(vec![0xA2, 0x36, 0x3D, 0x55]).await?;
//!
//!     let uid = reader.next_card().await?;
//!     assert_eq!(uid.to_string(), "A2363D55000000000000");
//!     Ok(())
//! }
//! ```

use crate::error::Result;
use crate::traits::TagReader;
use crate::types::TagFamily;
use crate::watchdog::Watchdog;
use tagin_core::CardUid;
use tracing::{trace, warn};

/// Card reader configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderConfig {
    /// Tag family accepted as a card. Targets of other families are ignored.
    pub family: TagFamily,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            family: TagFamily::Iso14443a,
        }
    }
}

/// Waits for cards on a tag reader device.
pub struct CardReader<R> {
    device: R,
    watchdog: Option<Watchdog>,
    config: ReaderConfig,
}

impl<R: TagReader> CardReader<R> {
    /// Wrap a device with the default configuration and no watchdog.
    pub fn new(device: R) -> Self {
        Self::with_config(device, ReaderConfig::default())
    }

    pub fn with_config(device: R, config: ReaderConfig) -> Self {
        Self {
            device,
            watchdog: None,
            config,
        }
    }

    /// Kick `watchdog` on every poll attempt.
    pub fn with_watchdog(mut self, watchdog: Watchdog) -> Self {
        self.watchdog = Some(watchdog);
        self
    }

    /// Access the underlying device.
    pub fn device(&self) -> &R {
        &self.device
    }

    /// Block until a card of the configured family is in the field.
    ///
    /// The returned UID may be the all-zero sentinel; filtering it is the
    /// caller's job. UIDs longer than 10 bytes are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns the device error as soon as a poll fails. Such errors mean
    /// the transport is gone and are not retried here.
    pub async fn next_card(&mut self) -> Result<CardUid> {
        loop {
            let polled = self.device.list_passive_targets().await;
            if let Some(watchdog) = &self.watchdog {
                watchdog.kick();
            }

            let targets = polled?;
            let found = targets
                .into_iter()
                .find(|target| target.family == self.config.family);

            match found {
                Some(target) => match CardUid::from_slice(&target.uid) {
                    Ok(uid) => {
                        trace!(uid = %uid, "Card in field");
                        return Ok(uid);
                    }
                    Err(e) => warn!("Ignoring tag: {}", e),
                },
                // Keep the runtime responsive when the device answers instantly.
                None => tokio::task::yield_now().await,
            }
        }
    }
}
