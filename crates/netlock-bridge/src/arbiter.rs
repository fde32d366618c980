//! Command arbiter.
//!
//! The arbiter is the only owner of the serial channel. Any number of callers
//! submit open commands through cloned [`ArbiterHandle`]s; a single worker task
//! drains a bounded FIFO queue and runs one write-then-read exchange at a time.
//!
//! ```text
//! ┌──────────┐
//! │ Handle   │──┐
//! └──────────┘  │    ┌──────────────┐    ┌────────┐    ┌───────────────┐
//! ┌──────────┐  ├───►│ Bounded FIFO │───►│ Worker │───►│ SerialChannel │
//! │ Handle   │──┤    │ (mpsc)       │    │ task   │    └───────────────┘
//! └──────────┘  │    └──────────────┘    └───┬────┘
//! ┌──────────┐  │                            │ oneshot per request
//! │ Handle   │──┘◄───────────────────────────┘
//! └──────────┘
//! ```
//!
//! # Request Lifecycle
//!
//! 1. `submit` validates and encodes the command. Invalid input fails here and
//!    never takes a queue slot.
//! 2. The frame is queued with `try_send`; a full queue fails with
//!    [`FailureReason::Busy`] immediately.
//! 3. The worker dequeues in arrival order. If the caller already gave up, the
//!    command is discarded without being sent.
//! 4. Otherwise the frame goes out with the per-command timeout, the reply is
//!    decoded and checked against the command, and exactly one
//!    [`CommandResult`] is delivered. The worker also bounds the exchange
//!    itself at the timeout plus [`TIMEOUT_GRACE`], so a channel that ignores
//!    its timeout cannot stall the queue.
//!
//! Nothing is ever retried: a lost reply does not prove the lock stayed shut.
//!
//! # Examples
//!
//! ```
//! use netlock_bridge::{ArbiterConfig, CommandArbiter, CommandResult};
//! use netlock_hardware::mock::MockSerialChannel;
//! use netlock_protocol::FrameCodec;
//!
//! #[tokio::main]
//! async fn main() {
//!     // The mock echoes every frame, which the controller treats as an ACK
//!     let (channel, _mock) = MockSerialChannel::new();
//!     let arbiter = CommandArbiter::new(channel, FrameCodec::default(), ArbiterConfig::default());
//!     let (handle, worker) = arbiter.start();
//!
//!     assert_eq!(handle.open(1, 12).await, CommandResult::Opened);
//!
//!     drop(handle);
//!     worker.join().await;
//! }
//! ```

use crate::outcome::{CommandResult, FailureReason};
use netlock_core::constants::{DEFAULT_COMMAND_TIMEOUT_MS, DEFAULT_QUEUE_CAPACITY};
use netlock_core::{DeviceAddress, LockNumber};
use netlock_hardware::SerialChannel;
use netlock_protocol::{CommandFrame, FrameCodec, ResponseStatus};
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Slack on top of the command timeout before the worker abandons an exchange
/// the channel has not finished itself.
pub const TIMEOUT_GRACE: Duration = Duration::from_millis(50);

/// Arbiter tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArbiterConfig {
    /// Timeout for one write-then-read round trip.
    pub command_timeout: Duration,

    /// Maximum number of commands waiting for the line (at least 1).
    pub queue_capacity: usize,
}

impl Default for ArbiterConfig {
    fn default() -> Self {
        Self {
            command_timeout: Duration::from_millis(DEFAULT_COMMAND_TIMEOUT_MS),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// A validated command waiting for the line.
#[derive(Debug)]
struct CommandRequest {
    frame: CommandFrame,
    submitted_at: Instant,
    reply: oneshot::Sender<CommandResult>,
}

/// Serializes open commands onto one serial channel.
///
/// Construct with [`CommandArbiter::new`], then call [`CommandArbiter::start`]
/// to spawn the worker.
#[derive(Debug)]
pub struct CommandArbiter<C> {
    channel: C,
    codec: FrameCodec,
    config: ArbiterConfig,
}

impl<C: SerialChannel> CommandArbiter<C> {
    pub fn new(channel: C, codec: FrameCodec, config: ArbiterConfig) -> Self {
        Self {
            channel,
            codec,
            config,
        }
    }

    /// Spawn the worker task.
    ///
    /// Must be called from within a Tokio runtime. The worker runs until every
    /// [`ArbiterHandle`] has been dropped and the queue is drained.
    pub fn start(self) -> (ArbiterHandle, ArbiterWorker) {
        let (queue, requests) = mpsc::channel(self.config.queue_capacity.max(1));

        let task = tokio::spawn(run_worker(
            self.channel,
            self.codec,
            self.config.command_timeout,
            requests,
        ));

        let handle = ArbiterHandle {
            queue,
            codec: self.codec,
        };
        (handle, ArbiterWorker { task })
    }
}

/// Cloneable submission side of the arbiter.
#[derive(Debug, Clone)]
pub struct ArbiterHandle {
    queue: mpsc::Sender<CommandRequest>,
    codec: FrameCodec,
}

impl ArbiterHandle {
    /// Validate, encode and enqueue an open command.
    ///
    /// Never waits: the queue either has room or the call fails.
    ///
    /// # Errors
    ///
    /// - `InvalidAddress` / `InvalidLockNumber` for out-of-range input
    /// - `Busy` if the queue is full
    /// - `ChannelError` if the worker is no longer running
    pub fn submit(&self, address: u8, lock: u8) -> Result<PendingCommand, FailureReason> {
        let frame = self.codec.encode(address, lock)?;
        let (address, lock) = (frame.address(), frame.lock());
        let (reply, receiver) = oneshot::channel();
        let request = CommandRequest {
            frame,
            submitted_at: Instant::now(),
            reply,
        };

        match self.queue.try_send(request) {
            Ok(()) => Ok(PendingCommand {
                receiver,
                address,
                lock,
            }),
            Err(TrySendError::Full(_)) => {
                warn!(%address, %lock, "Command queue full, rejecting");
                Err(FailureReason::Busy)
            }
            Err(TrySendError::Closed(_)) => Err(FailureReason::stopped()),
        }
    }

    /// Submit and wait for the outcome.
    pub async fn open(&self, address: u8, lock: u8) -> CommandResult {
        match self.submit(address, lock) {
            Ok(pending) => pending.wait().await,
            Err(reason) => CommandResult::Failed(reason),
        }
    }

    /// Submit and wait for the outcome, giving up at `deadline`.
    ///
    /// Giving up while the command is still queued withdraws it: the worker
    /// will discard it instead of sending it.
    pub async fn open_with_deadline(&self, address: u8, lock: u8, deadline: Instant) -> CommandResult {
        match self.submit(address, lock) {
            Ok(pending) => pending.wait_until(deadline).await,
            Err(reason) => CommandResult::Failed(reason),
        }
    }

    /// Number of commands currently waiting in the queue.
    pub fn queued(&self) -> usize {
        self.queue.max_capacity() - self.queue.capacity()
    }

    pub fn codec(&self) -> &FrameCodec {
        &self.codec
    }
}

/// A submitted command whose outcome has not been collected yet.
///
/// Dropping it withdraws the command if the worker has not picked it up.
#[derive(Debug)]
pub struct PendingCommand {
    receiver: oneshot::Receiver<CommandResult>,
    address: DeviceAddress,
    lock: LockNumber,
}

impl PendingCommand {
    /// Wait for the outcome.
    pub async fn wait(self) -> CommandResult {
        self.receiver
            .await
            .unwrap_or_else(|_| CommandResult::Failed(FailureReason::stopped()))
    }

    /// Wait for the outcome until `deadline`, then fail with `Timeout`.
    ///
    /// The caller sees the same `timeout` code whether the controller stayed
    /// silent or the deadline ran out first (queued behind other commands, or
    /// still on the line). The two are told apart in the log: an expired
    /// deadline is logged here as "Request deadline expired", a silent
    /// controller by the worker as "Open command failed". A command already on
    /// the line when the deadline passes still runs to completion and its
    /// result is logged by the worker.
    pub async fn wait_until(self, deadline: Instant) -> CommandResult {
        let Self {
            receiver,
            address,
            lock,
        } = self;
        match tokio::time::timeout_at(deadline, receiver).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => CommandResult::Failed(FailureReason::stopped()),
            Err(_) => {
                warn!(%address, %lock, "Request deadline expired before the command finished");
                CommandResult::Failed(FailureReason::Timeout)
            }
        }
    }
}

/// Join handle for the worker task.
#[derive(Debug)]
pub struct ArbiterWorker {
    task: JoinHandle<()>,
}

impl ArbiterWorker {
    /// Wait for the worker to finish.
    ///
    /// Returns once every [`ArbiterHandle`] is gone and the remaining queue
    /// has been processed.
    pub async fn join(self) {
        if let Err(e) = self.task.await {
            error!(error = %e, "Command arbiter worker failed");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

async fn run_worker<C: SerialChannel>(
    mut channel: C,
    codec: FrameCodec,
    command_timeout: Duration,
    mut requests: mpsc::Receiver<CommandRequest>,
) {
    info!(
        channel = channel.name(),
        timeout_ms = millis(command_timeout),
        "Command arbiter started"
    );

    while let Some(request) = requests.recv().await {
        let address = request.frame.address();
        let lock = request.frame.lock();

        if request.reply.is_closed() {
            debug!(%address, %lock, "Caller gave up before dispatch, discarding command");
            continue;
        }

        let result = execute(&mut channel, &codec, &request.frame, command_timeout).await;
        let elapsed_ms = millis(request.submitted_at.elapsed());

        match &result {
            CommandResult::Opened => info!(%address, %lock, elapsed_ms, "Lock opened"),
            CommandResult::Failed(reason @ FailureReason::ChannelError(_)) => {
                error!(%address, %lock, elapsed_ms, error = %reason, "Open command failed");
            }
            CommandResult::Failed(reason) => {
                warn!(%address, %lock, elapsed_ms, code = reason.code(), error = %reason, "Open command failed");
            }
        }

        if request.reply.send(result).is_err() {
            debug!(%address, %lock, "Caller gave up while command was in flight");
        }
    }

    info!("Command arbiter stopped");
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// One exchange on the line, classified into a terminal outcome.
async fn execute<C: SerialChannel>(
    channel: &mut C,
    codec: &FrameCodec,
    frame: &CommandFrame,
    timeout: Duration,
) -> CommandResult {
    debug!(frame = %frame, "Sending frame");

    let exchange = channel.write_read(frame.as_bytes(), codec.response_len(), timeout);
    let bytes = match tokio::time::timeout(timeout + TIMEOUT_GRACE, exchange).await {
        Ok(Ok(bytes)) => bytes,
        Ok(Err(e)) => return CommandResult::Failed(e.into()),
        Err(_) => {
            warn!(
                channel = channel.name(),
                timeout_ms = millis(timeout),
                "Channel overran its command timeout, abandoning exchange"
            );
            return CommandResult::Failed(FailureReason::Timeout);
        }
    };

    let response = match codec.decode(&bytes) {
        Ok(response) => response,
        Err(e) => {
            debug!(raw = ?&bytes[..], "Undecodable reply");
            return CommandResult::Failed(e.into());
        }
    };
    debug!(frame = %response, status = ?response.status(), "Reply received");

    if !response.answers(frame) {
        return CommandResult::Failed(FailureReason::MalformedResponse(format!(
            "reply is for device {:02} lock {}, expected device {} lock {}",
            response.echoed_address(),
            response.echoed_lock(),
            frame.address(),
            frame.lock(),
        )));
    }

    match response.status() {
        ResponseStatus::Ack => CommandResult::Opened,
        ResponseStatus::Nack(return_code) => {
            CommandResult::Failed(FailureReason::Rejected { return_code })
        }
        ResponseStatus::Unknown(command) => CommandResult::Failed(
            FailureReason::MalformedResponse(format!("reply carries command {command:#06x}")),
        ),
    }
}
