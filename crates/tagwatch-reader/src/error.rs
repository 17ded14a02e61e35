//! Error types for reader sessions.
//!
//! Per-cycle failures ([`ReaderError::Poll`], [`ReaderError::UnrecognizedScheme`])
//! are recovered by the polling loop. Everything else ends the session or
//! never lets it start.

use tagwatch_hardware::{HardwareError, Modulation};

use crate::session::SessionState;

/// Result type alias for reader operations.
pub type Result<T> = std::result::Result<T, ReaderError>;

/// Errors that can occur while driving a reader.
#[derive(Debug, thiserror::Error)]
pub enum ReaderError {
    /// The device could not be opened or put into initiator mode.
    #[error("Reader initialization failed: {0}")]
    Initialization(#[source] HardwareError),

    /// A single poll failed at the hardware level.
    #[error("Poll failed: {0}")]
    Poll(#[source] HardwareError),

    /// The detected target answered at a modulation outside the catalog.
    #[error("Unrecognized modulation scheme: {modulation}")]
    UnrecognizedScheme { modulation: Modulation },

    /// The reset line could not be driven.
    #[error("Reset line access failed: {0}")]
    LineAccess(#[source] HardwareError),

    /// The operation is not allowed in the session's current state.
    #[error("Cannot {operation} a reader session in state {state}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },

    /// Releasing the device failed.
    #[error("Failed to close reader: {0}")]
    Close(#[source] HardwareError),

    /// Configuration values are out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The polling worker terminated abnormally.
    #[error("Polling worker failed: {0}")]
    WorkerFailed(String),
}

impl ReaderError {
    /// Create an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Whether the polling loop should carry on after this error.
    ///
    /// # Examples
    ///
    /// ```
    /// use tagwatch_hardware::HardwareError;
    /// use tagwatch_reader::ReaderError;
    ///
    /// assert!(ReaderError::Poll(HardwareError::timeout(300)).is_recoverable());
    /// assert!(!ReaderError::Close(HardwareError::other("stuck")).is_recoverable());
    /// ```
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Poll(_) | Self::UnrecognizedScheme { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tagwatch_hardware::{BaudRate, ModulationType};

    #[test]
    fn test_error_display() {
        let err = ReaderError::UnrecognizedScheme {
            modulation: Modulation::new(ModulationType::Iso14443b2sr, BaudRate::Nbr106),
        };
        assert_eq!(
            err.to_string(),
            "Unrecognized modulation scheme: ISO/IEC 14443-2B ST SRx (106 kbps)"
        );

        let err = ReaderError::InvalidState {
            operation: "poll",
            state: SessionState::Closed,
        };
        assert_eq!(err.to_string(), "Cannot poll a reader session in state closed");
    }

    #[test]
    fn test_error_recoverability() {
        assert!(ReaderError::Poll(HardwareError::disconnected("ACR122U")).is_recoverable());
        assert!(
            ReaderError::UnrecognizedScheme {
                modulation: Modulation::new(ModulationType::Dep, BaudRate::Nbr424),
            }
            .is_recoverable()
        );

        assert!(!ReaderError::Initialization(HardwareError::other("no reader")).is_recoverable());
        assert!(
            !ReaderError::LineAccess(HardwareError::line_access("gpio19", "busy")).is_recoverable()
        );
        assert!(
            !ReaderError::InvalidState {
                operation: "close",
                state: SessionState::Uninitialized,
            }
            .is_recoverable()
        );
        assert!(!ReaderError::WorkerFailed("panicked".into()).is_recoverable());
    }

    #[test]
    fn test_error_source() {
        use std::error::Error;

        let err = ReaderError::Poll(HardwareError::timeout(300));
        assert!(err.source().is_some());
    }
}
