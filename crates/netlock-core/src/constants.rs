//! Core constants for the RS485 lock controller protocol.
//!
//! This module pins the byte values of the lock controller wire format and the
//! default operating limits of the bridge. Values here describe the F3 controller
//! family; a controller with a different datasheet supplies its own
//! `ProtocolTable` in `netlock-protocol` instead of editing these constants.
//!
//! # Frame Structure
//!
//! Commands and responses share one fixed-length layout:
//!
//! ```text
//! F3 | LEN_HI LEN_LO | CMD_HI CMD_LO | ADDR | RET_HI RET_LO | DATA | LRC
//! ^^   ^^^^^^^^^^^^^   ^^^^^^^^^^^^^   ^^^^   ^^^^^^^^^^^^^   ^^^^   ^^^
//! |    bytes after     opcode          BCD    return code     lock   XOR of
//! |    the length                      addr   (0000 = ACK)    number LEN..DATA
//! start
//! ```
//!
//! # Usage
//!
//! ```
//! use netlock_core::constants::*;
//!
//! assert_eq!(FRAME_START, 0xF3);
//! assert_eq!(OPEN_COMMAND, 0x0111);
//! assert_eq!(FRAME_LEN, 10);
//!
//! fn is_valid_address(address: u8) -> bool {
//!     (MIN_DEVICE_ADDRESS..=MAX_DEVICE_ADDRESS).contains(&address)
//! }
//! assert!(is_valid_address(1));
//! ```

// ============================================================================
// Wire Format
// ============================================================================

/// Start byte that opens every frame on the line.
pub const FRAME_START: u8 = 0xF3;

/// Opcode for the "open lock" command.
///
/// Transmitted big endian (`01 11`).
pub const OPEN_COMMAND: u16 = 0x0111;

/// Return code carried by commands and by accepted (ACK) responses.
///
/// Any other return code in a response is a negative acknowledgement.
pub const RETURN_CODE_ACK: u16 = 0x0000;

/// Value of the length field: number of bytes from the opcode through the
/// checksum (opcode 2 + address 1 + return code 2 + data 1 + checksum 1).
pub const LENGTH_FIELD: u16 = 0x0007;

/// Total frame length without a terminator.
pub const FRAME_LEN: usize = 10;

/// Byte offsets inside a frame.
pub mod offset {
    pub const START: usize = 0;
    pub const LENGTH: usize = 1;
    pub const COMMAND: usize = 3;
    pub const ADDRESS: usize = 5;
    pub const RETURN_CODE: usize = 6;
    pub const DATA: usize = 8;
    pub const CHECKSUM: usize = 9;
}

// ============================================================================
// Addressing
// ============================================================================

/// Minimum device address on the shared line.
pub const MIN_DEVICE_ADDRESS: u8 = 0;

/// Maximum device address (two decimal digits, packed BCD on the wire).
pub const MAX_DEVICE_ADDRESS: u8 = 99;

/// Minimum lock number within one controller.
pub const MIN_LOCK_NUMBER: u8 = 0;

/// Maximum lock number within one controller.
pub const MAX_LOCK_NUMBER: u8 = 99;

// ============================================================================
// Bridge Defaults
// ============================================================================

/// Default per-command round trip timeout in milliseconds.
///
/// Matches the one second read timeout the controller line has always been
/// operated with.
pub const DEFAULT_COMMAND_TIMEOUT_MS: u64 = 1000;

/// Default bound of the arbiter queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 32;

/// Default deadline for one inbound HTTP open request in milliseconds.
pub const DEFAULT_REQUEST_DEADLINE_MS: u64 = 5000;

/// Default HTTP listen host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default HTTP listen port.
pub const DEFAULT_PORT: u16 = 5000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_len_matches_length_field() {
        // start byte + two length bytes + counted bytes
        assert_eq!(FRAME_LEN, 3 + LENGTH_FIELD as usize);
        assert_eq!(offset::CHECKSUM, FRAME_LEN - 1);
    }

    #[test]
    fn test_address_range_fits_bcd() {
        assert!(MAX_DEVICE_ADDRESS <= 99);
    }
}
