//! Error types for serial channel operations.
//!
//! A timeout is kept distinct from every other failure: the bridge reports it
//! as its own outcome, while all other variants are channel faults.

/// Result type alias for serial channel operations.
pub type Result<T> = std::result::Result<T, ChannelError>;

/// Errors that can occur while talking to the serial line.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// No complete response arrived within the deadline.
    #[error("Operation timeout after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// The line is not open (degraded) or was closed under us.
    #[error("Serial port disconnected: {port}")]
    Disconnected { port: String },

    /// Opening or reopening the port failed.
    #[error("Failed to open {port}: {message}")]
    OpenFailed { port: String, message: String },

    /// Device communication error.
    #[error("Communication error: {message}")]
    CommunicationError { message: String },

    /// Error reported by the serial port driver.
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ChannelError {
    /// Create a new timeout error.
    pub fn timeout(duration: std::time::Duration) -> Self {
        Self::Timeout {
            duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Create a new disconnected error.
    pub fn disconnected(port: impl Into<String>) -> Self {
        Self::Disconnected { port: port.into() }
    }

    /// Create a new open failure.
    pub fn open_failed(port: impl Into<String>, message: impl Into<String>) -> Self {
        Self::OpenFailed {
            port: port.into(),
            message: message.into(),
        }
    }

    /// Create a new communication error.
    pub fn communication(message: impl Into<String>) -> Self {
        Self::CommunicationError {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_timeout_error() {
        let error = ChannelError::timeout(Duration::from_millis(1000));
        assert!(error.is_timeout());
        assert_eq!(error.to_string(), "Operation timeout after 1000ms");
    }

    #[test]
    fn test_disconnected_error() {
        let error = ChannelError::disconnected("/dev/ttyUSB0");
        assert!(!error.is_timeout());
        assert_eq!(error.to_string(), "Serial port disconnected: /dev/ttyUSB0");
    }

    #[test]
    fn test_open_failed_error() {
        let error = ChannelError::open_failed("/dev/ttyUSB0", "No such file or directory");
        assert_eq!(
            error.to_string(),
            "Failed to open /dev/ttyUSB0: No such file or directory"
        );
    }

    #[test]
    fn test_io_error_is_fault() {
        let error = ChannelError::from(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "pipe closed",
        ));
        assert!(!error.is_timeout());
        assert!(matches!(error, ChannelError::Io(_)));
    }
}
