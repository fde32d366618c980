//! Frame codec for the RS485 lock controller protocol.
//!
//! Pure byte-level encoding of "open lock" commands and decoding of controller
//! acknowledgements. Nothing in this crate performs I/O; all controller-specific
//! byte values live in [`ProtocolTable`].

pub mod checksum;
pub mod codec;
pub mod frame;
pub mod response;
pub mod table;

pub use checksum::lrc;
pub use codec::FrameCodec;
pub use frame::CommandFrame;
pub use response::{ResponseFrame, ResponseStatus};
pub use table::{AddressLimits, ProtocolTable};
