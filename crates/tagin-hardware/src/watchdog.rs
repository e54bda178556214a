//! Liveness watchdog for the tag reader.
//!
//! A wedged USB reader can leave the poll loop stuck inside a driver call
//! forever, and there is no in-process way back from that. The watchdog runs
//! on its own OS thread, outside the Tokio runtime, and terminates the whole
//! process when the poll loop stops kicking it. The service supervisor
//! (systemd) then restarts the station with a fresh USB session.
//!
//! ```text
//! poll loop ──kick()──► [bounded channel] ──► watchdog thread
//!                                               │ no kick within timeout
//!                                               ▼
//!                                         terminate_process()
//! ```
//!
//! # Examples
//!
//! ```no_run
//! use std::time::Duration;
//! use tagin_hardware::watchdog::Watchdog;
//!
//! # fn example() -> tagin_hardware::Result<()> {
//! let watchdog = Watchdog::arm(Duration::from_secs(3))?;
//!
//! loop {
//!     // poll the reader ...
//!     watchdog.kick();
//! }
//! # }
//! ```

use crate::error::Result;
use std::sync::mpsc::{self, RecvTimeoutError, SyncSender, TrySendError};
use std::thread;
use std::time::Duration;
use tracing::{debug, error};

/// Kicks that may queue up before the watchdog thread drains them.
///
/// A full queue already proves liveness, so further kicks are dropped.
const KICK_BUFFER: usize = 5;

/// Exit status used when the watchdog fires.
pub const WATCHDOG_EXIT_CODE: i32 = 1;

/// Handle to an armed watchdog.
///
/// Clones share the same timer. When every handle is dropped the watchdog
/// thread disarms and exits quietly.
#[derive(Debug, Clone)]
pub struct Watchdog {
    kick_tx: SyncSender<()>,
    timeout: Duration,
}

impl Watchdog {
    /// Arm a watchdog that terminates the process after `timeout` without a
    /// kick.
    ///
    /// # Errors
    ///
    /// Returns an error if the watchdog thread cannot be spawned.
    pub fn arm(timeout: Duration) -> Result<Self> {
        Self::arm_with(timeout, || terminate_process())
    }

    /// Arm a watchdog with a custom expiry action instead of terminating the
    /// process.
    ///
    /// `on_expire` runs at most once, on the watchdog thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the watchdog thread cannot be spawned.
    pub fn arm_with<F>(timeout: Duration, on_expire: F) -> Result<Self>
    where
        F: FnOnce() + Send + 'static,
    {
        let (kick_tx, kick_rx) = mpsc::sync_channel::<()>(KICK_BUFFER);

        thread::Builder::new()
            .name("watchdog".to_string())
            .spawn(move || {
                loop {
                    match kick_rx.recv_timeout(timeout) {
                        Ok(()) => continue,
                        Err(RecvTimeoutError::Timeout) => {
                            error!(
                                timeout_ms = timeout.as_millis() as u64,
                                "Watchdog reached timeout"
                            );
                            on_expire();
                            return;
                        }
                        Err(RecvTimeoutError::Disconnected) => {
                            debug!("All watchdog handles dropped, disarming");
                            return;
                        }
                    }
                }
            })?;

        Ok(Self { kick_tx, timeout })
    }

    /// Reset the timer. Never blocks.
    pub fn kick(&self) {
        match self.kick_tx.try_send(()) {
            Ok(()) | Err(TrySendError::Full(())) => {}
            // Watchdog already fired or disarmed; nothing left to feed.
            Err(TrySendError::Disconnected(())) => {}
        }
    }

    /// The configured timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Terminate the process immediately.
///
/// This is the watchdog's only way of signalling failure. It is deliberately
/// not an error value: nothing in the process gets to catch it.
pub fn terminate_process() -> ! {
    error!("Terminating process, supervisor is expected to restart it");
    std::process::exit(WATCHDOG_EXIT_CODE)
}
