//! Mock device implementations for testing and development.
//!
//! This module provides simulated device implementations that can be controlled
//! programmatically without requiring physical hardware.

pub mod tag;

// Re-export commonly used types
pub use tag::{MockTagReader, MockTagReaderHandle};
