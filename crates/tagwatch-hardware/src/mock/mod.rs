//! Mock device implementations for testing and development.
//!
//! This module provides simulated device implementations that can be controlled
//! programmatically without requiring physical hardware.

pub mod nfc;
pub mod reset;

// Re-export commonly used types
pub use nfc::{MockNfcDevice, MockNfcDriver, MockNfcHandle, PollRequest};
pub use reset::{LineWrite, MockResetLine, MockResetLineHandle};
