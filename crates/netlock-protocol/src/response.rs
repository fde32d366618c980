use crate::frame::{CommandFrame, write_hex};
use bytes::Bytes;
use std::fmt;

/// Outcome reported by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseStatus {
    /// Command accepted and executed.
    Ack,

    /// Command refused; carries the controller's return code.
    Nack(u16),

    /// Reply to some other opcode than the one we send.
    Unknown(u16),
}

impl ResponseStatus {
    #[must_use]
    pub fn is_ack(self) -> bool {
        matches!(self, ResponseStatus::Ack)
    }
}

/// Decoded controller reply.
///
/// Checksum, length and terminator have already been verified by the codec;
/// the echoed address and lock still have to be compared against the command
/// with [`ResponseFrame::answers`] before trusting the status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseFrame {
    status: ResponseStatus,
    echoed_address: u8,
    echoed_lock: u8,
    raw: Bytes,
}

impl ResponseFrame {
    pub(crate) fn new(status: ResponseStatus, echoed_address: u8, echoed_lock: u8, raw: Bytes) -> Self {
        Self {
            status,
            echoed_address,
            echoed_lock,
            raw,
        }
    }

    pub fn status(&self) -> ResponseStatus {
        self.status
    }

    /// Address the controller claims to be (decoded from BCD).
    pub fn echoed_address(&self) -> u8 {
        self.echoed_address
    }

    /// Lock number echoed in the data byte.
    pub fn echoed_lock(&self) -> u8 {
        self.echoed_lock
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }

    /// Returns `true` if this reply echoes the address and lock of `command`.
    ///
    /// A mismatch means the line delivered someone else's answer (a stale or
    /// misrouted reply) and must not be treated as success.
    pub fn answers(&self, command: &CommandFrame) -> bool {
        self.echoed_address == command.address().as_u8()
            && self.echoed_lock == command.lock().as_u8()
    }
}

impl fmt::Display for ResponseFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_hex(f, &self.raw)
    }
}
