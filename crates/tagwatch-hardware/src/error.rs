//! Error types for hardware operations.
//!
//! This module defines error types specific to NFC reader and reset line
//! operations, covering failure scenarios such as device disconnection,
//! timeouts, malformed reader responses and unavailable GPIO lines.

/// Result type alias for hardware operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Errors that can occur during hardware device operations.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// Device is not connected or has been disconnected.
    #[error("Device disconnected: {device}")]
    Disconnected { device: String },

    /// Operation timed out after specified duration.
    #[error("Operation timeout after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// Device communication error.
    #[error("Communication error: {message}")]
    CommunicationError { message: String },

    /// Invalid data received from device.
    #[error("Invalid data: {message}")]
    InvalidData { message: String },

    /// Device initialization failed.
    #[error("Initialization failed: {message}")]
    InitializationFailed { message: String },

    /// Device is already held by another session.
    #[error("Device busy: {device}")]
    DeviceBusy { device: String },

    /// Digital output line could not be accessed.
    #[error("Line access error on {line}: {message}")]
    LineAccess { line: String, message: String },

    /// Generic error with custom message.
    #[error("{0}")]
    Other(String),
}

impl HardwareError {
    /// Create a new disconnected error.
    pub fn disconnected(device: impl Into<String>) -> Self {
        Self::Disconnected {
            device: device.into(),
        }
    }

    /// Create a new timeout error.
    pub fn timeout(duration_ms: u64) -> Self {
        Self::Timeout { duration_ms }
    }

    /// Create a new communication error.
    pub fn communication(message: impl Into<String>) -> Self {
        Self::CommunicationError {
            message: message.into(),
        }
    }

    /// Create a new invalid data error.
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }

    /// Create a new initialization failed error.
    pub fn initialization_failed(message: impl Into<String>) -> Self {
        Self::InitializationFailed {
            message: message.into(),
        }
    }

    /// Create a new device busy error.
    pub fn device_busy(device: impl Into<String>) -> Self {
        Self::DeviceBusy {
            device: device.into(),
        }
    }

    /// Create a new line access error.
    pub fn line_access(line: impl Into<String>, message: impl Into<String>) -> Self {
        Self::LineAccess {
            line: line.into(),
            message: message.into(),
        }
    }

    /// Create a generic error with custom message.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disconnected_error() {
        let error = HardwareError::disconnected("ACR122U");
        assert!(matches!(error, HardwareError::Disconnected { .. }));
        assert_eq!(error.to_string(), "Device disconnected: ACR122U");
    }

    #[test]
    fn test_timeout_error() {
        let error = HardwareError::timeout(300);
        assert!(matches!(error, HardwareError::Timeout { .. }));
        assert_eq!(error.to_string(), "Operation timeout after 300ms");
    }

    #[test]
    fn test_device_busy_error() {
        let error = HardwareError::device_busy("Mock NFC Reader");
        assert_eq!(error.to_string(), "Device busy: Mock NFC Reader");
    }

    #[test]
    fn test_line_access_error() {
        let error = HardwareError::line_access("gpio19", "permission denied");
        assert!(matches!(error, HardwareError::LineAccess { .. }));
        assert_eq!(
            error.to_string(),
            "Line access error on gpio19: permission denied"
        );
    }
}
