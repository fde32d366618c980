use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // Input validation errors
    #[error("Invalid device address: {value} (must be {min}-{max})")]
    InvalidAddress { value: u8, min: u8, max: u8 },

    #[error("Invalid lock number: {value} (must be {min}-{max})")]
    InvalidLockNumber { value: u8, min: u8, max: u8 },

    #[error("Invalid device address text: {0:?}")]
    InvalidAddressText(String),

    #[error("Invalid lock number text: {0:?}")]
    InvalidLockNumberText(String),

    // Protocol errors
    #[error("Malformed response: {0}")]
    MalformedResponse(FrameDefect),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Reason a received frame was rejected by the decoder.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameDefect {
    #[error("expected {expected} bytes, got {actual}")]
    Length { expected: usize, actual: usize },

    #[error("bad start byte: expected {expected:#04x}, got {actual:#04x}")]
    StartByte { expected: u8, actual: u8 },

    #[error("bad length field: expected {expected:#06x}, got {actual:#06x}")]
    LengthField { expected: u16, actual: u16 },

    #[error("missing terminator {expected:#04x}, got {actual:#04x}")]
    MissingTerminator { expected: u8, actual: u8 },

    #[error("checksum mismatch: expected {expected:#04x}, got {actual:#04x}")]
    Checksum { expected: u8, actual: u8 },

    #[error("address byte {0:#04x} is not packed BCD")]
    AddressEncoding(u8),
}

impl Error {
    /// Returns `true` for errors caused by caller input rather than hardware.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::InvalidAddress { .. }
                | Error::InvalidLockNumber { .. }
                | Error::InvalidAddressText(_)
                | Error::InvalidLockNumberText(_)
        )
    }
}

impl From<FrameDefect> for Error {
    fn from(defect: FrameDefect) -> Self {
        Error::MalformedResponse(defect)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
