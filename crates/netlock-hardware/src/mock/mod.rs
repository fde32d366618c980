//! Mock serial line for testing and development.
//!
//! The mock can be scripted programmatically and records every frame written
//! to it, so bridge behaviour can be checked without a physical controller.

pub mod serial;

pub use serial::{MockReply, MockSerialChannel, MockSerialHandle, MockStep, WriteRecord};
