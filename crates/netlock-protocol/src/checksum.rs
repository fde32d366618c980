//! Longitudinal redundancy check used by the controller.

/// XOR of all bytes.
///
/// The controller computes it over the length, opcode, address, return code
/// and data bytes, excluding the start byte and any terminator.
///
/// ```
/// use netlock_protocol::lrc;
///
/// assert_eq!(lrc(&[0x00, 0x07, 0x01, 0x11, 0x01, 0x00, 0x00, 0x0C]), 0x1A);
/// assert_eq!(lrc(&[]), 0);
/// ```
#[inline]
#[must_use]
pub fn lrc(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, &b| acc ^ b)
}
