//! Mock tag reader implementation for testing and development.
//!
//! This module provides a simulated reader field that can be controlled
//! programmatically for testing without requiring physical hardware.

use crate::{
    HardwareError, Result,
    traits::TagReader,
    types::{ReaderInfo, Target},
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;

/// How long one mock poll waits for a tag before reporting an empty field.
const DEFAULT_SCAN_WINDOW: Duration = Duration::from_millis(50);

/// Mock tag reader for testing and development.
///
/// Each call to [`list_passive_targets`](TagReader::list_passive_targets)
/// waits up to the scan window for an event queued through the handle,
/// like a real reader scanning its field for a fixed period.
///
/// # Examples
///
/// ```
/// use tagin_hardware::mock::MockTagReader;
/// use tagin_hardware::traits::TagReader;
///
/// #[tokio::main]
/// async fn main() -> tagin_hardware::Result<()> {
///     let (mut reader, handle) = MockTagReader::new();
///
///     // Nothing in the field yet
///     assert!(reader.list_passive_targets().await?.is_empty());
///
///     handle.present(vec![0x04, 0xAB, 0xCD, 0xEF]).await?;
///     let targets = reader.list_passive_targets().await?;
///     assert_eq!(targets[0].uid, vec![0x04, 0xAB, 0xCD, 0xEF]);
///
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockTagReader {
    /// Channel receiver for field events
    event_rx: mpsc::Receiver<FieldEvent>,

    /// Device name
    name: String,

    /// Bounded wait per poll
    scan_window: Duration,

    /// Poll attempts so far, shared with the handle
    polls: Arc<AtomicUsize>,
}

impl MockTagReader {
    /// Create a new mock reader with the default name.
    ///
    /// Returns a tuple of (MockTagReader, MockTagReaderHandle) where the
    /// handle can be used to simulate taps and faults.
    pub fn new() -> (Self, MockTagReaderHandle) {
        Self::with_name("Mock Tag Reader".to_string())
    }

    /// Create a new mock reader with a custom name.
    pub fn with_name(name: String) -> (Self, MockTagReaderHandle) {
        let (event_tx, event_rx) = mpsc::channel(32);
        let polls = Arc::new(AtomicUsize::new(0));

        let reader = Self {
            event_rx,
            name: name.clone(),
            scan_window: DEFAULT_SCAN_WINDOW,
            polls: Arc::clone(&polls),
        };

        let handle = MockTagReaderHandle {
            event_tx,
            name,
            polls,
        };

        (reader, handle)
    }

    /// Change how long each poll waits for a tag.
    pub fn with_scan_window(mut self, scan_window: Duration) -> Self {
        self.scan_window = scan_window;
        self
    }
}

impl TagReader for MockTagReader {
    async fn list_passive_targets(&mut self) -> Result<Vec<Target>> {
        self.polls.fetch_add(1, Ordering::SeqCst);

        match tokio::time::timeout(self.scan_window, self.event_rx.recv()).await {
            Err(_elapsed) => Ok(Vec::new()),
            Ok(Some(FieldEvent::Present(target))) => Ok(vec![target]),
            Ok(Some(FieldEvent::Fault(message))) => Err(HardwareError::communication(message)),
            Ok(None) => Err(HardwareError::disconnected(format!(
                "{}: control handle dropped",
                self.name
            ))),
        }
    }

    async fn get_reader_info(&self) -> Result<ReaderInfo> {
        Ok(ReaderInfo::new(
            self.name.clone(),
            vec!["ISO14443A".to_string(), "ISO14443B".to_string()],
        )
        .with_max_baud_rate(424000))
    }
}

/// Internal event type for the mock reader field.
#[derive(Debug, Clone)]
enum FieldEvent {
    Present(Target),
    Fault(String),
}

/// Handle for controlling a mock tag reader.
///
/// Dropping every handle makes the reader report a disconnect once the
/// queued events are consumed.
#[derive(Debug, Clone)]
pub struct MockTagReaderHandle {
    /// Channel sender for field events
    event_tx: mpsc::Sender<FieldEvent>,

    /// Device name
    name: String,

    /// Poll attempts so far
    polls: Arc<AtomicUsize>,
}

impl MockTagReaderHandle {
    /// Present an ISO 14443-A tag with the given UID.
    ///
    /// # Errors
    ///
    /// Returns an error if the reader has been dropped.
    pub async fn present(&self, uid: Vec<u8>) -> Result<()> {
        self.present_target(Target::iso14443a(uid)).await
    }

    /// Present an arbitrary target, including foreign tag families.
    ///
    /// # Errors
    ///
    /// Returns an error if the reader has been dropped.
    pub async fn present_target(&self, target: Target) -> Result<()> {
        self.send(FieldEvent::Present(target)).await
    }

    /// Make the next poll fail with a communication error.
    ///
    /// # Errors
    ///
    /// Returns an error if the reader has been dropped.
    pub async fn fail(&self, message: impl Into<String>) -> Result<()> {
        self.send(FieldEvent::Fault(message.into())).await
    }

    /// Number of polls the reader has performed.
    pub fn poll_count(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    /// Get the device name.
    pub fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, event: FieldEvent) -> Result<()> {
        self.event_tx
            .send(event)
            .await
            .map_err(|_| HardwareError::disconnected(format!("{}: reader dropped", self.name)))
    }
}
