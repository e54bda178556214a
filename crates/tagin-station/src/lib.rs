//! Station logic for the tagin workshop tap-in system.
//!
//! This crate ties the hardware and storage layers together:
//!
//! - [`ArrivalNotifier`]: single-slot broadcast of the latest arrival, read
//!   by the dashboard's long poll
//! - [`Station`]: registry plus notifier, shared with the web layer
//! - [`TapOrchestrator`]: the reader loop (feedback, broadcast, audit)

pub mod notifier;
pub mod orchestrator;
pub mod station;

pub use notifier::ArrivalNotifier;
pub use orchestrator::TapOrchestrator;
pub use station::Station;
