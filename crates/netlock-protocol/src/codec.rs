//! Encoding of open commands and decoding of controller replies.
//!
//! [`FrameCodec`] is a pure value: the same inputs always yield the same
//! bytes, and decoding never touches I/O. It is cheap to clone, so every
//! component that needs it keeps its own copy.
//!
//! # Example
//!
//! ```
//! use netlock_protocol::{FrameCodec, ResponseStatus};
//!
//! # fn example() -> netlock_core::Result<()> {
//! let codec = FrameCodec::default();
//!
//! let command = codec.encode(1, 12)?;
//! assert_eq!(
//!     command.as_bytes(),
//!     &[0xF3, 0x00, 0x07, 0x01, 0x11, 0x01, 0x00, 0x00, 0x0C, 0x1A]
//! );
//!
//! // The controller acknowledges by echoing the command with return code 0000
//! let reply = codec.decode(command.as_bytes())?;
//! assert_eq!(reply.status(), ResponseStatus::Ack);
//! assert!(reply.answers(&command));
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```
//!
//! # Address Encoding
//!
//! Device addresses travel as packed BCD: address 12 is sent as `0x12`. Lock
//! numbers travel as plain binary: lock 12 is sent as `0x0C`.

use bytes::{BufMut, Bytes, BytesMut};
use netlock_core::{
    DeviceAddress, Error, FrameDefect, LockNumber, Result,
    constants::{LENGTH_FIELD, MIN_DEVICE_ADDRESS, MIN_LOCK_NUMBER, offset},
};

use crate::{
    CommandFrame, ResponseFrame, ResponseStatus, checksum::lrc,
    table::{AddressLimits, ProtocolTable},
};

/// Encoder/decoder for one controller model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameCodec {
    table: ProtocolTable,
    limits: AddressLimits,
}

impl FrameCodec {
    /// Create a codec for the given table and limits.
    pub fn new(table: ProtocolTable, limits: AddressLimits) -> Self {
        Self { table, limits }
    }

    pub fn table(&self) -> &ProtocolTable {
        &self.table
    }

    pub fn limits(&self) -> &AddressLimits {
        &self.limits
    }

    /// Number of bytes a complete controller reply occupies.
    pub fn response_len(&self) -> usize {
        self.table.frame_len()
    }

    /// Build the open command for `address` / `lock`.
    ///
    /// # Errors
    /// Returns `Error::InvalidAddress` or `Error::InvalidLockNumber` if either
    /// value is outside the configured limits. Nothing is encoded in that case.
    pub fn encode(&self, address: u8, lock: u8) -> Result<CommandFrame> {
        if address > self.limits.max_address() {
            return Err(Error::InvalidAddress {
                value: address,
                min: MIN_DEVICE_ADDRESS,
                max: self.limits.max_address(),
            });
        }
        if lock > self.limits.max_lock() {
            return Err(Error::InvalidLockNumber {
                value: lock,
                min: MIN_LOCK_NUMBER,
                max: self.limits.max_lock(),
            });
        }
        let address = DeviceAddress::new(address)?;
        let lock = LockNumber::new(lock)?;

        let data = self.assemble(
            self.table.open_command,
            to_bcd(address.as_u8()),
            self.table.ack_code,
            lock.as_u8(),
        );
        Ok(CommandFrame::new(data, address, lock))
    }

    /// Build the bytes a controller would answer with.
    ///
    /// Used by controller simulators and test doubles; `return_code` equal to
    /// the table's ACK code produces an acknowledgement.
    ///
    /// # Errors
    /// Returns `Error::InvalidAddress` if `address` cannot be expressed as two
    /// BCD digits.
    pub fn response_bytes(&self, address: u8, lock: u8, return_code: u16) -> Result<Bytes> {
        let address = DeviceAddress::new(address)?;
        Ok(self.assemble(
            self.table.open_command,
            to_bcd(address.as_u8()),
            return_code,
            lock,
        ))
    }

    /// Parse and verify a controller reply.
    ///
    /// # Errors
    /// Returns `Error::MalformedResponse` if the byte count is wrong, the start
    /// byte, length field or terminator do not match the table, the checksum
    /// does not match the recomputed value, or the address byte is not BCD.
    pub fn decode(&self, bytes: &[u8]) -> Result<ResponseFrame> {
        let expected_len = self.table.frame_len();
        if bytes.len() != expected_len {
            return Err(FrameDefect::Length {
                expected: expected_len,
                actual: bytes.len(),
            }
            .into());
        }

        if bytes[offset::START] != self.table.start_byte {
            return Err(FrameDefect::StartByte {
                expected: self.table.start_byte,
                actual: bytes[offset::START],
            }
            .into());
        }

        if let Some(terminator) = self.table.terminator {
            let last = bytes[expected_len - 1];
            if last != terminator {
                return Err(FrameDefect::MissingTerminator {
                    expected: terminator,
                    actual: last,
                }
                .into());
            }
        }

        let length = read_u16(bytes, offset::LENGTH);
        if length != LENGTH_FIELD {
            return Err(FrameDefect::LengthField {
                expected: LENGTH_FIELD,
                actual: length,
            }
            .into());
        }

        let expected_sum = lrc(&bytes[offset::LENGTH..offset::CHECKSUM]);
        let actual_sum = bytes[offset::CHECKSUM];
        if expected_sum != actual_sum {
            return Err(FrameDefect::Checksum {
                expected: expected_sum,
                actual: actual_sum,
            }
            .into());
        }

        let address_byte = bytes[offset::ADDRESS];
        let echoed_address =
            from_bcd(address_byte).ok_or(FrameDefect::AddressEncoding(address_byte))?;

        let command = read_u16(bytes, offset::COMMAND);
        let return_code = read_u16(bytes, offset::RETURN_CODE);
        let status = if command != self.table.open_command {
            ResponseStatus::Unknown(command)
        } else if return_code == self.table.ack_code {
            ResponseStatus::Ack
        } else {
            ResponseStatus::Nack(return_code)
        };

        Ok(ResponseFrame::new(
            status,
            echoed_address,
            bytes[offset::DATA],
            Bytes::copy_from_slice(bytes),
        ))
    }

    fn assemble(&self, command: u16, address_byte: u8, return_code: u16, data: u8) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.table.frame_len());
        buf.put_u8(self.table.start_byte);
        buf.put_u16(LENGTH_FIELD);
        buf.put_u16(command);
        buf.put_u8(address_byte);
        buf.put_u16(return_code);
        buf.put_u8(data);

        let sum = lrc(&buf[offset::LENGTH..]);
        buf.put_u8(sum);

        if let Some(terminator) = self.table.terminator {
            buf.put_u8(terminator);
        }
        buf.freeze()
    }
}

fn read_u16(bytes: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([bytes[at], bytes[at + 1]])
}

/// Pack a value in 0-99 as two BCD digits.
fn to_bcd(value: u8) -> u8 {
    debug_assert!(value <= 99);
    ((value / 10) << 4) | (value % 10)
}

fn from_bcd(byte: u8) -> Option<u8> {
    let (tens, units) = (byte >> 4, byte & 0x0F);
    (tens <= 9 && units <= 9).then_some(tens * 10 + units)
}
