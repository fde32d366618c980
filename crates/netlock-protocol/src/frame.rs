use bytes::Bytes;
use netlock_core::{DeviceAddress, LockNumber};
use std::fmt;

/// Encoded "open lock" command, ready for the wire.
///
/// Only [`FrameCodec::encode`](crate::FrameCodec::encode) builds these, so a
/// `CommandFrame` always carries a validated address and lock number.
///
/// # Wire Format
///
/// ```text
/// f3 00 07 01 11 01 00 00 0c 1a
/// ^^ ^^^^^ ^^^^^ ^^ ^^^^^ ^^ ^^
/// |  len   open  |  ret   |  LRC
/// start          addr     lock
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFrame {
    /// Raw bytes including start byte, checksum and terminator
    data: Bytes,

    address: DeviceAddress,

    lock: LockNumber,
}

impl CommandFrame {
    pub(crate) fn new(data: Bytes, address: DeviceAddress, lock: LockNumber) -> Self {
        Self {
            data,
            address,
            lock,
        }
    }

    /// Get the raw bytes of the frame
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Get a cheap clone of the underlying buffer
    pub fn bytes(&self) -> Bytes {
        self.data.clone()
    }

    /// Get the frame size in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Address the command is sent to
    pub fn address(&self) -> DeviceAddress {
        self.address
    }

    /// Lock the command opens
    pub fn lock(&self) -> LockNumber {
        self.lock
    }
}

/// Lowercase hex with spaces, the form used in logs.
impl fmt::Display for CommandFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_hex(f, &self.data)
    }
}

pub(crate) fn write_hex(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 {
            f.write_str(" ")?;
        }
        write!(f, "{b:02x}")?;
    }
    Ok(())
}
