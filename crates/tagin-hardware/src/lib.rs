//! Hardware layer for the tagin workshop station.
//!
//! This crate owns everything that touches a peripheral: the proximity tag
//! reader the station polls, the watchdog that guards it, and the sound and
//! light feedback fired after each tap.
//!
//! # Design Philosophy
//!
//! - **Async-first**: device I/O uses native `async fn` in traits (Rust 1.90 +
//!   Edition 2024 RPITIT).
//! - **Generic, not dynamic**: the async traits are not object-safe, so the
//!   station is generic over its reader.
//! - **Fail loudly**: a device error ends the poll loop. The watchdog covers
//!   the case where the device never answers at all.
//!
//! # Reading Cards
//!
//! ```no_run
//! use std::time::Duration;
//! use tagin_hardware::{CardReader, TagReader, Watchdog};
//!
//! async fn run<R: TagReader>(device: R) -> tagin_hardware::Result<()> {
//!     let watchdog = Watchdog::arm(Duration::from_secs(3))?;
//!     let mut reader = CardReader::new(device).with_watchdog(watchdog);
//!
//!     loop {
//!         let uid = reader.next_card().await?;
//!         println!("card {uid}");
//!     }
//! }
//! ```
//!
//! # Devices
//!
//! - [`mock::MockTagReader`] for tests and development
//! - [`wedge::KeyboardWedgeReader`] for USB readers that emulate a keyboard
//! - `pcsc_reader::PcscTagReader` for PC/SC readers (feature `hardware-pcsc`)

pub mod error;
pub mod indicator;
pub mod mock;
#[cfg(feature = "hardware-pcsc")]
pub mod pcsc_reader;
pub mod reader;
pub mod traits;
pub mod types;
pub mod watchdog;
pub mod wedge;

// Re-export commonly used types for convenience
pub use error::{HardwareError, Result};
pub use indicator::{Chime, Feedback, Orb};
pub use reader::{CardReader, ReaderConfig};
pub use traits::{Indicator, SilentIndicator, TagReader};
pub use types::{LedColor, ReaderInfo, TagFamily, Target};
pub use watchdog::Watchdog;
pub use wedge::KeyboardWedgeReader;
