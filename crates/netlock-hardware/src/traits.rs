//! Serial channel trait definition.
//!
//! The trait is the seam between the command arbiter and the physical line:
//! the arbiter only ever calls [`SerialChannel::write_read`], and knows nothing
//! about ports, baud rates or reopen policy.
//!
//! The method is declared as returning `impl Future + Send` rather than as a
//! bare `async fn` so that generic callers can move the channel into a spawned
//! Tokio task. Implementations still write a plain `async fn`.

use crate::error::Result;
use bytes::Bytes;
use std::future::Future;
use std::time::Duration;

/// Exclusive, single-caller access to one serial line.
///
/// # Contract
///
/// - `write_read` takes `&mut self`: a second exchange cannot start before the
///   first resolves. There is no internal queueing.
/// - The timeout covers the whole round trip (write plus waiting for
///   `response_len` bytes).
/// - On timeout the call fails with [`ChannelError::Timeout`]; every other
///   failure is a channel fault.
///
/// # Examples
///
/// ```
/// use netlock_hardware::traits::SerialChannel;
/// use netlock_hardware::mock::MockSerialChannel;
/// use std::time::Duration;
///
/// # #[tokio::main]
/// # async fn main() -> netlock_hardware::Result<()> {
/// let (mut channel, handle) = MockSerialChannel::new();
///
/// // The default mock behaviour echoes the frame back
/// let reply = channel
///     .write_read(&[0xF3, 0x01], 2, Duration::from_millis(100))
///     .await?;
/// assert_eq!(&reply[..], &[0xF3, 0x01]);
/// assert_eq!(handle.call_count(), 1);
/// # Ok(())
/// # }
/// ```
///
/// [`ChannelError::Timeout`]: crate::error::ChannelError::Timeout
pub trait SerialChannel: Send + 'static {
    /// Write `frame`, then wait for exactly `response_len` bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No complete response arrives within `timeout`
    /// - The line is disconnected and cannot be reopened
    /// - The driver reports an I/O fault
    fn write_read(
        &mut self,
        frame: &[u8],
        response_len: usize,
        timeout: Duration,
    ) -> impl Future<Output = Result<Bytes>> + Send;

    /// Human readable name of the line (device path for real ports).
    fn name(&self) -> &str;

    /// Returns `true` while the line is known to be unusable.
    fn is_degraded(&self) -> bool {
        false
    }
}
