//! Mock serial line for testing and development.
//!
//! This module provides a simulated serial channel that can be scripted
//! programmatically, so the arbiter can be exercised without a controller.
//! The channel and its handle share state: tests script replies through the
//! handle and inspect what was written afterwards.

use crate::{
    Result,
    error::ChannelError,
    traits::SerialChannel,
};
use bytes::Bytes;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// What the simulated line does with one written frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockReply {
    /// Send the written frame back unchanged.
    ///
    /// For controllers that acknowledge by echoing the command (return code
    /// 0000), an echo is a valid ACK.
    Echo,

    /// Send these bytes back.
    Bytes(Bytes),

    /// Never answer.
    Silent,

    /// Fail with a channel fault carrying this message.
    Fault(String),
}

/// One scripted exchange: a reply and how long the line takes to produce it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockStep {
    pub reply: MockReply,
    pub delay: Duration,
}

impl MockStep {
    pub fn echo() -> Self {
        Self::new(MockReply::Echo)
    }

    pub fn reply(bytes: impl Into<Bytes>) -> Self {
        Self::new(MockReply::Bytes(bytes.into()))
    }

    pub fn silent() -> Self {
        Self::new(MockReply::Silent)
    }

    pub fn fault(message: impl Into<String>) -> Self {
        Self::new(MockReply::Fault(message.into()))
    }

    /// Delay the reply by `delay`.
    #[must_use]
    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn new(reply: MockReply) -> Self {
        Self {
            reply,
            delay: Duration::ZERO,
        }
    }
}

/// A frame written to the mock line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRecord {
    /// Bytes written
    pub frame: Bytes,

    /// When the exchange started
    pub started: Instant,

    /// When the exchange resolved (`None` while still in flight)
    pub finished: Option<Instant>,
}

#[derive(Debug)]
struct MockState {
    script: VecDeque<MockStep>,
    default: MockStep,
    writes: Vec<WriteRecord>,
    in_flight: bool,
    overlaps: usize,
}

fn lock(state: &Mutex<MockState>) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Mock serial channel.
///
/// # Examples
///
/// ```
/// use netlock_hardware::mock::{MockSerialChannel, MockStep};
/// use netlock_hardware::traits::SerialChannel;
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() {
///     let (mut channel, handle) = MockSerialChannel::new();
///     handle.enqueue(MockStep::silent());
///
///     let result = channel
///         .write_read(&[0x01], 1, Duration::from_millis(10))
///         .await;
///     assert!(result.unwrap_err().is_timeout());
/// }
/// ```
#[derive(Debug)]
pub struct MockSerialChannel {
    state: Arc<Mutex<MockState>>,
    name: String,
}

impl MockSerialChannel {
    /// Create a new mock channel that echoes every frame.
    ///
    /// Returns a tuple of (MockSerialChannel, MockSerialHandle) where the
    /// handle scripts replies and records what was written.
    pub fn new() -> (Self, MockSerialHandle) {
        Self::with_name("mock".to_string())
    }

    /// Create a new mock channel with a custom name.
    pub fn with_name(name: String) -> (Self, MockSerialHandle) {
        let state = Arc::new(Mutex::new(MockState {
            script: VecDeque::new(),
            default: MockStep::echo(),
            writes: Vec::new(),
            in_flight: false,
            overlaps: 0,
        }));

        let channel = Self {
            state: Arc::clone(&state),
            name,
        };
        (channel, MockSerialHandle { state })
    }
}

impl SerialChannel for MockSerialChannel {
    async fn write_read(
        &mut self,
        frame: &[u8],
        response_len: usize,
        timeout: Duration,
    ) -> Result<Bytes> {
        let written = Bytes::copy_from_slice(frame);

        let (step, index) = {
            let mut state = lock(&self.state);
            if state.in_flight {
                state.overlaps += 1;
            }
            state.in_flight = true;
            state.writes.push(WriteRecord {
                frame: written.clone(),
                started: Instant::now(),
                finished: None,
            });
            let step = match state.script.pop_front() {
                Some(step) => step,
                None => state.default.clone(),
            };
            (step, state.writes.len() - 1)
        };

        let outcome = tokio::time::timeout(timeout, async move {
            tokio::time::sleep(step.delay).await;
            let bytes = match step.reply {
                MockReply::Echo => written,
                MockReply::Bytes(bytes) => bytes,
                MockReply::Silent => std::future::pending::<Bytes>().await,
                MockReply::Fault(message) => return Err(ChannelError::communication(message)),
            };
            if bytes.len() < response_len {
                // Like a real line: an incomplete answer is waited on until the deadline
                std::future::pending::<()>().await;
            }
            Ok(bytes.slice(..response_len))
        })
        .await;

        let result = match outcome {
            Ok(result) => result,
            Err(_) => Err(ChannelError::timeout(timeout)),
        };

        let mut state = lock(&self.state);
        state.in_flight = false;
        state.writes[index].finished = Some(Instant::now());
        result
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Handle for scripting a mock serial channel.
#[derive(Debug, Clone)]
pub struct MockSerialHandle {
    state: Arc<Mutex<MockState>>,
}

impl MockSerialHandle {
    /// Queue a step for the next unscripted exchange.
    pub fn enqueue(&self, step: MockStep) {
        lock(&self.state).script.push_back(step);
    }

    /// Behaviour used once the script is exhausted.
    pub fn set_default(&self, step: MockStep) {
        lock(&self.state).default = step;
    }

    /// Number of `write_read` calls so far.
    pub fn call_count(&self) -> usize {
        lock(&self.state).writes.len()
    }

    /// Snapshot of every write, in order.
    pub fn writes(&self) -> Vec<WriteRecord> {
        lock(&self.state).writes.clone()
    }

    /// Number of exchanges that started while another was still in flight.
    pub fn overlap_count(&self) -> usize {
        lock(&self.state).overlaps
    }
}
