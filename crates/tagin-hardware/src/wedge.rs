//! Keyboard-wedge tag reader.
//!
//! Cheap USB readers enumerate as a keyboard and "type" the UID of each tag
//! as hex digits followed by Enter. [`KeyboardWedgeReader`] adapts any line source
//! (usually stdin) to the [`TagReader`] polling interface. Each poll waits
//! for at most one scan window, so an idle reader still reports empty polls
//! and keeps the watchdog fed.

use crate::error::{HardwareError, Result};
use crate::traits::TagReader;
use crate::types::{ReaderInfo, Target};
use std::time::Duration;
use tagin_core::CardUid;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tracing::warn;

/// Default time one poll waits for a typed line.
pub const DEFAULT_SCAN_WINDOW: Duration = Duration::from_millis(250);

/// Tag reader fed by hex lines from a keyboard wedge.
#[derive(Debug)]
pub struct KeyboardWedgeReader<R> {
    lines: Lines<R>,
    scan_window: Duration,
    name: String,
}

impl<R> KeyboardWedgeReader<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    pub fn new(source: R) -> Self {
        Self {
            lines: source.lines(),
            scan_window: DEFAULT_SCAN_WINDOW,
            name: "Keyboard wedge".to_string(),
        }
    }

    pub fn with_scan_window(mut self, scan_window: Duration) -> Self {
        self.scan_window = scan_window;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl<R> TagReader for KeyboardWedgeReader<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    async fn list_passive_targets(&mut self) -> Result<Vec<Target>> {
        // `Lines::next_line` is cancel safe, so a partial line survives the timeout.
        let line = match tokio::time::timeout(self.scan_window, self.lines.next_line()).await {
            Err(_elapsed) => return Ok(Vec::new()),
            Ok(line) => line?,
        };

        let Some(line) = line else {
            return Err(HardwareError::disconnected(format!(
                "{}: input closed",
                self.name
            )));
        };

        let line = line.trim();
        if line.is_empty() {
            return Ok(Vec::new());
        }

        match CardUid::from_hex(line) {
            Ok(uid) => Ok(vec![Target::iso14443a(uid.as_bytes().to_vec())]),
            Err(e) => {
                warn!(input = line, "Ignoring wedge input: {}", e);
                Ok(Vec::new())
            }
        }
    }

    async fn get_reader_info(&self) -> Result<ReaderInfo> {
        Ok(ReaderInfo::new(self.name.clone(), vec!["ISO14443A".to_string()]))
    }
}
