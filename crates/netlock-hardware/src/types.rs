//! Types shared by serial channel implementations.

use std::fmt;

/// Where and how to open the serial line.
///
/// The controller line runs 8N1 without flow control; only the device path
/// and the baud rate vary between installations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialSettings {
    /// Device path (e.g., "/dev/ttyUSB0", "COM3").
    pub path: String,

    /// Line speed in bits per second.
    pub baud_rate: u32,
}

impl SerialSettings {
    pub fn new(path: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            path: path.into(),
            baud_rate,
        }
    }
}

impl fmt::Display for SerialSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.path, self.baud_rate)
    }
}
