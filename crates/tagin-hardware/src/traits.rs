//! Hardware device trait definitions.
//!
//! These traits are the seams between the station and its peripherals: the
//! tag reader it polls and the indicator it fires after every tap. Drivers
//! for real devices and mocks for tests implement the same traits.
//!
//! All traits use native `async fn` methods (Rust 1.90 + Edition 2024 RPITIT),
//! eliminating the need for the `async_trait` macro.

#![allow(async_fn_in_trait)]

use crate::error::Result;
use crate::types::{ReaderInfo, Target};
use tagin_core::TapOutcome;

/// Proximity tag reader abstraction.
///
/// A reader exposes a single polling primitive: list the tags currently in
/// its field. Blocking until a tag shows up is the job of
/// [`CardReader`](crate::reader::CardReader), which also feeds the watchdog
/// between polls.
///
/// # Object Safety and Dynamic Dispatch
///
/// **NOTE**: This trait is NOT object-safe because `async fn` methods return
/// `impl Future`, which is an opaque type that cannot be used in trait objects
/// (Edition 2024 RPITIT). Use generic type parameters instead:
///
/// ```no_run
/// use tagin_hardware::traits::TagReader;
/// use tagin_hardware::error::Result;
///
/// async fn count_tags<R: TagReader>(reader: &mut R) -> Result<usize> {
///     Ok(reader.list_passive_targets().await?.len())
/// }
/// ```
pub trait TagReader: Send {
    /// Poll the field once.
    ///
    /// Implementations may wait for a bounded scan window before answering.
    /// An empty list means no tag is present and is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error only for device-level faults:
    /// - The device is disconnected
    /// - The transport reports a communication error
    async fn list_passive_targets(&mut self) -> Result<Vec<Target>>;

    /// Get reader information.
    ///
    /// # Errors
    ///
    /// Returns an error if a communication error occurs while querying
    /// reader information.
    async fn get_reader_info(&self) -> Result<ReaderInfo>;
}

/// Tap feedback (sound, light) for the person at the reader.
///
/// Fire-and-forget: implementations must return immediately and absorb their
/// own failures. They are called from inside the Tokio runtime and may spawn
/// tasks.
pub trait Indicator: Send + Sync {
    /// Signal the outcome of a tap.
    fn trigger(&self, outcome: TapOutcome);
}

impl<I: Indicator + ?Sized> Indicator for std::sync::Arc<I> {
    fn trigger(&self, outcome: TapOutcome) {
        (**self).trigger(outcome);
    }
}

/// Indicator that does nothing, for headless installs.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentIndicator;

impl Indicator for SilentIndicator {
    fn trigger(&self, _outcome: TapOutcome) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Recording(Mutex<Vec<TapOutcome>>);

    impl Indicator for Recording {
        fn trigger(&self, outcome: TapOutcome) {
            self.0.lock().unwrap().push(outcome);
        }
    }

    #[test]
    fn test_arc_indicator_forwards() {
        let recording = Arc::new(Recording::default());
        let shared: Arc<Recording> = Arc::clone(&recording);

        shared.trigger(TapOutcome::Recognized);
        shared.trigger(TapOutcome::Unrecognized);

        assert_eq!(
            *recording.0.lock().unwrap(),
            vec![TapOutcome::Recognized, TapOutcome::Unrecognized]
        );
    }

    #[test]
    fn test_silent_indicator() {
        SilentIndicator.trigger(TapOutcome::Recognized);
    }
}
