//! Command arbitration for the NetLock bridge.
//!
//! Many concurrent open requests share one half-duplex serial line. This
//! crate turns them into a strictly sequential stream of exchanges and hands
//! each caller exactly one [`CommandResult`].
//!
//! See [`arbiter`] for the request lifecycle.

pub mod arbiter;
pub mod outcome;

pub use arbiter::{
    ArbiterConfig, ArbiterHandle, ArbiterWorker, CommandArbiter, PendingCommand, TIMEOUT_GRACE,
};
pub use outcome::{CommandResult, FailureReason};
