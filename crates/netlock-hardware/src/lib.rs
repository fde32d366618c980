//! Serial line abstraction for the NetLock bridge.
//!
//! This crate owns the one physical resource the bridge has: the serial line
//! to the lock controllers. It exposes a single operation, a bounded
//! write-then-read round trip, behind the [`SerialChannel`] trait, with two
//! implementations:
//!
//! - [`SerialPortChannel`] drives a real port through the `serialport` crate,
//!   with a reopen-once fault policy and a degraded mode.
//! - [`MockSerialChannel`] is a scripted in-memory line used by tests and by
//!   the `mock` port setting.
//!
//! # Concurrency
//!
//! `write_read` takes `&mut self`, so a channel can only ever serve one caller
//! at a time. Serializing many callers is the arbiter's job, not this crate's.
//!
//! ```no_run
//! use netlock_hardware::{SerialChannel, SerialPortChannel, SerialSettings};
//! use std::time::Duration;
//!
//! # async fn demo() -> netlock_hardware::Result<()> {
//! let mut channel = SerialPortChannel::open(SerialSettings::new("/dev/ttyUSB0", 9600)).await?;
//! let reply = channel
//!     .write_read(&[0xF3, 0x00, 0x07], 10, Duration::from_secs(1))
//!     .await?;
//! println!("{} bytes back", reply.len());
//! # Ok(())
//! # }
//! ```
//!
//! [`SerialPortChannel`]: serial::SerialPortChannel
//! [`MockSerialChannel`]: mock::MockSerialChannel

pub mod devices;
pub mod error;
pub mod mock;
pub mod serial;
pub mod traits;
pub mod types;

pub use devices::AnySerialChannel;
pub use error::{ChannelError, Result};
pub use serial::SerialPortChannel;
pub use traits::SerialChannel;
pub use types::SerialSettings;
