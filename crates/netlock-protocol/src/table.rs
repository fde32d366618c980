//! Controller constant table and address limits.

use netlock_core::{
    Error, Result,
    constants::{
        FRAME_LEN, FRAME_START, MAX_DEVICE_ADDRESS, MAX_LOCK_NUMBER, OPEN_COMMAND,
        RETURN_CODE_ACK,
    },
};

/// Byte values pinned from the controller datasheet.
///
/// The default table describes the F3 controller family. A controller model
/// with different values gets its own table; the concurrency logic never looks
/// at these bytes.
///
/// # Examples
///
/// ```
/// use netlock_protocol::ProtocolTable;
///
/// let table = ProtocolTable::default();
/// assert_eq!(table.frame_len(), 10);
///
/// let terminated = ProtocolTable {
///     terminator: Some(0x0D),
///     ..ProtocolTable::default()
/// };
/// assert_eq!(terminated.frame_len(), 11);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolTable {
    /// First byte of every frame.
    pub start_byte: u8,

    /// Opcode of the open command.
    pub open_command: u16,

    /// Return code meaning "accepted".
    pub ack_code: u16,

    /// Optional trailing byte after the checksum.
    pub terminator: Option<u8>,
}

impl Default for ProtocolTable {
    fn default() -> Self {
        Self {
            start_byte: FRAME_START,
            open_command: OPEN_COMMAND,
            ack_code: RETURN_CODE_ACK,
            terminator: None,
        }
    }
}

impl ProtocolTable {
    /// Total length of a command or response frame.
    #[must_use]
    pub fn frame_len(&self) -> usize {
        FRAME_LEN + usize::from(self.terminator.is_some())
    }
}

/// Highest address and lock number accepted by the codec.
///
/// Installations with fewer controllers or relays narrow these so that typos
/// are rejected before anything is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressLimits {
    max_address: u8,
    max_lock: u8,
}

impl AddressLimits {
    /// Create limits.
    ///
    /// # Errors
    /// Returns `Error::Config` if a limit exceeds what two decimal digits allow.
    pub fn new(max_address: u8, max_lock: u8) -> Result<Self> {
        if max_address > MAX_DEVICE_ADDRESS || max_lock > MAX_LOCK_NUMBER {
            return Err(Error::Config(format!(
                "address limits {max_address}/{max_lock} exceed {MAX_DEVICE_ADDRESS}/{MAX_LOCK_NUMBER}"
            )));
        }
        Ok(Self {
            max_address,
            max_lock,
        })
    }

    #[must_use]
    pub fn max_address(&self) -> u8 {
        self.max_address
    }

    #[must_use]
    pub fn max_lock(&self) -> u8 {
        self.max_lock
    }
}

impl Default for AddressLimits {
    fn default() -> Self {
        Self {
            max_address: MAX_DEVICE_ADDRESS,
            max_lock: MAX_LOCK_NUMBER,
        }
    }
}
