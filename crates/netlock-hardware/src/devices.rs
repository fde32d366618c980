//! Enum wrapper for serial channel dispatch.
//!
//! Native `async fn` in traits is not object-safe, so the binary cannot hold a
//! `Box<dyn SerialChannel>`. Instead it picks a variant at startup and the
//! arbiter stays generic over one concrete type.
//!
//! # Examples
//!
//! ```
//! use netlock_hardware::devices::AnySerialChannel;
//! use netlock_hardware::mock::MockSerialChannel;
//! use netlock_hardware::traits::SerialChannel;
//!
//! let (channel, _handle) = MockSerialChannel::new();
//! let any = AnySerialChannel::Mock(channel);
//! assert_eq!(any.name(), "mock");
//! ```

use crate::Result;
use crate::mock::MockSerialChannel;
use crate::serial::SerialPortChannel;
use crate::traits::SerialChannel;
use bytes::Bytes;
use std::time::Duration;

/// Any supported serial line.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnySerialChannel {
    /// Real port through the `serialport` crate.
    Serial(SerialPortChannel),

    /// Scripted in-memory line for development and testing.
    Mock(MockSerialChannel),
}

impl SerialChannel for AnySerialChannel {
    async fn write_read(
        &mut self,
        frame: &[u8],
        response_len: usize,
        timeout: Duration,
    ) -> Result<Bytes> {
        match self {
            Self::Serial(channel) => channel.write_read(frame, response_len, timeout).await,
            Self::Mock(channel) => channel.write_read(frame, response_len, timeout).await,
        }
    }

    fn name(&self) -> &str {
        match self {
            Self::Serial(channel) => channel.name(),
            Self::Mock(channel) => channel.name(),
        }
    }

    fn is_degraded(&self) -> bool {
        match self {
            Self::Serial(channel) => channel.is_degraded(),
            Self::Mock(channel) => channel.is_degraded(),
        }
    }
}

impl From<SerialPortChannel> for AnySerialChannel {
    fn from(channel: SerialPortChannel) -> Self {
        Self::Serial(channel)
    }
}

impl From<MockSerialChannel> for AnySerialChannel {
    fn from(channel: MockSerialChannel) -> Self {
        Self::Mock(channel)
    }
}
