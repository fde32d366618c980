use crate::{
    Result,
    constants::{MAX_DEVICE_ADDRESS, MAX_LOCK_NUMBER, MIN_DEVICE_ADDRESS, MIN_LOCK_NUMBER},
    error::Error,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Address of one lock controller on the shared line (2 digits, zero-padded)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeviceAddress(u8);

impl DeviceAddress {
    /// Create a new device address with validation.
    ///
    /// # Errors
    /// Returns `Error::InvalidAddress` if the address is outside 0-99.
    pub fn new(address: u8) -> Result<Self> {
        if !(MIN_DEVICE_ADDRESS..=MAX_DEVICE_ADDRESS).contains(&address) {
            return Err(Error::InvalidAddress {
                value: address,
                min: MIN_DEVICE_ADDRESS,
                max: MAX_DEVICE_ADDRESS,
            });
        }
        Ok(DeviceAddress(address))
    }

    /// Get the raw address as u8.
    #[must_use]
    pub fn as_u8(&self) -> u8 {
        self.0
    }

    /// Format the address as a zero-padded 2-digit string.
    #[must_use]
    pub fn to_string_padded(&self) -> String {
        format!("{:02}", self.0)
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:02}", self.0)
    }
}

impl std::str::FromStr for DeviceAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let value = parse_two_digits(s).ok_or_else(|| Error::InvalidAddressText(s.to_string()))?;
        DeviceAddress::new(value)
    }
}

/// Number of one lock (relay) managed by a controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LockNumber(u8);

impl LockNumber {
    /// Create a new lock number with validation.
    ///
    /// # Errors
    /// Returns `Error::InvalidLockNumber` if the number is outside 0-99.
    pub fn new(number: u8) -> Result<Self> {
        if !(MIN_LOCK_NUMBER..=MAX_LOCK_NUMBER).contains(&number) {
            return Err(Error::InvalidLockNumber {
                value: number,
                min: MIN_LOCK_NUMBER,
                max: MAX_LOCK_NUMBER,
            });
        }
        Ok(LockNumber(number))
    }

    /// Get the raw lock number as u8.
    #[must_use]
    pub fn as_u8(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for LockNumber {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:02}", self.0)
    }
}

impl std::str::FromStr for LockNumber {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let value =
            parse_two_digits(s).ok_or_else(|| Error::InvalidLockNumberText(s.to_string()))?;
        LockNumber::new(value)
    }
}

/// Parse one or two ASCII decimal digits.
///
/// Signs, whitespace and longer inputs are rejected so that `"+1"` or `"007"`
/// never alias a valid address.
fn parse_two_digits(s: &str) -> Option<u8> {
    if s.is_empty() || s.len() > 2 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}
