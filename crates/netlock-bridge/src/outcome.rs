//! Terminal outcomes of an open command.

use netlock_core::Error;
use netlock_hardware::ChannelError;

/// Why an open command did not succeed.
///
/// Every variant has a stable snake_case code (see [`FailureReason::code`])
/// that callers can match on without parsing messages.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FailureReason {
    /// Device address outside the configured range, or not a number.
    #[error("{0}")]
    InvalidAddress(String),

    /// Lock number outside the configured range, or not a number.
    #[error("{0}")]
    InvalidLockNumber(String),

    /// The command queue is full; nothing was sent.
    #[error("Command queue is full, try again later")]
    Busy,

    /// The controller did not answer within the command timeout.
    #[error("No response from controller")]
    Timeout,

    /// The reply failed verification or answered a different command.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The controller answered with a non-zero return code.
    #[error("Controller rejected the command (return code {return_code:#06x})")]
    Rejected { return_code: u16 },

    /// The serial line failed or the arbiter is no longer running.
    #[error("Serial channel error: {0}")]
    ChannelError(String),
}

impl FailureReason {
    /// Stable result code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidAddress(_) => "invalid_address",
            Self::InvalidLockNumber(_) => "invalid_lock_number",
            Self::Busy => "busy",
            Self::Timeout => "timeout",
            Self::MalformedResponse(_) => "malformed_response",
            Self::Rejected { .. } => "rejected",
            Self::ChannelError(_) => "channel_error",
        }
    }

    /// Returns `true` if the request was refused before reaching the line.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::InvalidAddress(_) | Self::InvalidLockNumber(_))
    }

    pub(crate) fn stopped() -> Self {
        Self::ChannelError("arbiter stopped".to_string())
    }
}

impl From<Error> for FailureReason {
    fn from(error: Error) -> Self {
        match error {
            Error::InvalidAddress { .. } | Error::InvalidAddressText(_) => {
                Self::InvalidAddress(error.to_string())
            }
            Error::InvalidLockNumber { .. } | Error::InvalidLockNumberText(_) => {
                Self::InvalidLockNumber(error.to_string())
            }
            Error::MalformedResponse(defect) => Self::MalformedResponse(defect.to_string()),
            Error::Config(message) => Self::ChannelError(message),
        }
    }
}

impl From<ChannelError> for FailureReason {
    fn from(error: ChannelError) -> Self {
        if error.is_timeout() {
            Self::Timeout
        } else {
            Self::ChannelError(error.to_string())
        }
    }
}

/// Final result of one open command. Exactly one is produced per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    /// The controller acknowledged the command for the requested lock.
    Opened,

    Failed(FailureReason),
}

impl CommandResult {
    #[must_use]
    pub fn is_opened(&self) -> bool {
        matches!(self, Self::Opened)
    }

    /// Stable result code: `"opened"` or the failure code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Opened => "opened",
            Self::Failed(reason) => reason.code(),
        }
    }

    pub fn failure(&self) -> Option<&FailureReason> {
        match self {
            Self::Opened => None,
            Self::Failed(reason) => Some(reason),
        }
    }
}

impl From<FailureReason> for CommandResult {
    fn from(reason: FailureReason) -> Self {
        Self::Failed(reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netlock_core::FrameDefect;
    use rstest::rstest;
    use std::time::Duration;

    #[rstest]
    #[case(FailureReason::InvalidAddress("x".into()), "invalid_address")]
    #[case(FailureReason::InvalidLockNumber("x".into()), "invalid_lock_number")]
    #[case(FailureReason::Busy, "busy")]
    #[case(FailureReason::Timeout, "timeout")]
    #[case(FailureReason::MalformedResponse("x".into()), "malformed_response")]
    #[case(FailureReason::Rejected { return_code: 1 }, "rejected")]
    #[case(FailureReason::ChannelError("x".into()), "channel_error")]
    fn test_failure_codes(#[case] reason: FailureReason, #[case] code: &str) {
        assert_eq!(reason.code(), code);
        assert_eq!(CommandResult::Failed(reason).code(), code);
    }

    #[test]
    fn test_opened_code() {
        assert_eq!(CommandResult::Opened.code(), "opened");
        assert!(CommandResult::Opened.is_opened());
        assert!(CommandResult::Opened.failure().is_none());
    }

    #[test]
    fn test_from_core_errors() {
        let reason = FailureReason::from(Error::InvalidAddress {
            value: 100,
            min: 0,
            max: 99,
        });
        assert_eq!(reason.code(), "invalid_address");
        assert!(reason.is_validation());
        assert!(reason.to_string().contains("100"));

        let reason = FailureReason::from(Error::InvalidLockNumberText("ab".into()));
        assert_eq!(reason.code(), "invalid_lock_number");

        let reason = FailureReason::from(Error::MalformedResponse(FrameDefect::Checksum {
            expected: 0x1A,
            actual: 0x00,
        }));
        assert_eq!(reason.code(), "malformed_response");
        assert!(!reason.is_validation());
    }

    #[test]
    fn test_from_channel_errors() {
        let reason = FailureReason::from(ChannelError::timeout(Duration::from_millis(500)));
        assert_eq!(reason, FailureReason::Timeout);

        let reason = FailureReason::from(ChannelError::disconnected("/dev/ttyUSB0"));
        assert_eq!(reason.code(), "channel_error");
        assert!(reason.to_string().contains("/dev/ttyUSB0"));
    }

    #[test]
    fn test_rejected_message() {
        let reason = FailureReason::Rejected { return_code: 5 };
        assert_eq!(
            reason.to_string(),
            "Controller rejected the command (return code 0x0005)"
        );
    }
}
