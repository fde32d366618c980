//! Integration tests for the command arbiter against the mock serial line.

use bytes::Bytes;
use futures::future::join_all;
use netlock_bridge::{
    ArbiterConfig, ArbiterHandle, ArbiterWorker, CommandArbiter, CommandResult, FailureReason,
    TIMEOUT_GRACE,
};
use netlock_hardware::SerialChannel;
use netlock_hardware::mock::{MockSerialChannel, MockSerialHandle, MockStep};
use netlock_protocol::{FrameCodec, lrc};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::Instant;

const DATA_OFFSET: usize = 8;

fn start_arbiter(timeout_ms: u64, capacity: usize) -> (ArbiterHandle, ArbiterWorker, MockSerialHandle) {
    let (channel, mock) = MockSerialChannel::new();
    let config = ArbiterConfig {
        command_timeout: Duration::from_millis(timeout_ms),
        queue_capacity: capacity,
    };
    let (handle, worker) = CommandArbiter::new(channel, FrameCodec::default(), config).start();
    (handle, worker, mock)
}

/// A line whose exchanges never finish, whatever timeout they are given.
struct StalledChannel {
    calls: Arc<AtomicUsize>,
}

impl SerialChannel for StalledChannel {
    async fn write_read(
        &mut self,
        _frame: &[u8],
        _response_len: usize,
        _timeout: Duration,
    ) -> netlock_hardware::Result<Bytes> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }

    fn name(&self) -> &str {
        "stalled"
    }
}

async fn wait_for_calls(mock: &MockSerialHandle, calls: usize) {
    while mock.call_count() < calls {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn test_open_1_12_ack() {
    let (handle, _worker, mock) = start_arbiter(1000, 8);

    let result = handle.open(1, 12).await;

    assert_eq!(result, CommandResult::Opened);
    let writes = mock.writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(
        &writes[0].frame[..],
        &[0xF3, 0x00, 0x07, 0x01, 0x11, 0x01, 0x00, 0x00, 0x0C, 0x1A]
    );
}

#[tokio::test(start_paused = true)]
async fn test_open_1_12_nack_is_rejected() {
    let (handle, _worker, mock) = start_arbiter(1000, 8);
    let nack = FrameCodec::default().response_bytes(1, 12, 0x0005).unwrap();
    mock.enqueue(MockStep::reply(nack));

    let result = handle.open(1, 12).await;

    assert_eq!(
        result,
        CommandResult::Failed(FailureReason::Rejected { return_code: 0x0005 })
    );
}

#[tokio::test(start_paused = true)]
async fn test_out_of_range_never_reaches_channel() {
    let (handle, _worker, mock) = start_arbiter(1000, 8);

    let result = handle.open(100, 1).await;
    assert!(matches!(
        result,
        CommandResult::Failed(FailureReason::InvalidAddress(_))
    ));

    let result = handle.open(1, 100).await;
    assert!(matches!(
        result,
        CommandResult::Failed(FailureReason::InvalidLockNumber(_))
    ));

    assert!(handle.submit(255, 255).is_err());
    tokio::task::yield_now().await;
    assert_eq!(mock.call_count(), 0);
    assert_eq!(handle.queued(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_opens_never_overlap() {
    let (handle, _worker, mock) = start_arbiter(1000, 16);
    mock.set_default(MockStep::echo().after(Duration::from_millis(20)));

    let opens = (0..10u8).map(|lock| {
        let handle = handle.clone();
        tokio::spawn(async move { handle.open(1, lock).await })
    });
    let results = join_all(opens).await;

    for result in results {
        assert_eq!(result.unwrap(), CommandResult::Opened);
    }
    assert_eq!(mock.call_count(), 10);
    assert_eq!(mock.overlap_count(), 0);

    let writes = mock.writes();
    for pair in writes.windows(2) {
        let previous_finished = pair[0].finished.unwrap();
        assert!(pair[1].started >= previous_finished);
    }
}

#[tokio::test(start_paused = true)]
async fn test_silent_channel_times_out() {
    let (handle, _worker, mock) = start_arbiter(250, 8);
    mock.set_default(MockStep::silent());

    let start = Instant::now();
    let result = handle.open(1, 12).await;
    let elapsed = start.elapsed();

    assert_eq!(result, CommandResult::Failed(FailureReason::Timeout));
    assert!(elapsed >= Duration::from_millis(250));
    assert!(elapsed < Duration::from_millis(300));
}

#[tokio::test(start_paused = true)]
async fn test_echo_mismatch_is_malformed() {
    let (handle, _worker, mock) = start_arbiter(1000, 8);
    // Valid frame and checksum, but for device 02
    let other = FrameCodec::default().response_bytes(2, 12, 0).unwrap();
    mock.enqueue(MockStep::reply(other));

    let result = handle.open(1, 12).await;

    assert!(matches!(
        result,
        CommandResult::Failed(FailureReason::MalformedResponse(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_bad_checksum_is_malformed() {
    let (handle, _worker, mock) = start_arbiter(1000, 8);
    mock.enqueue(MockStep::reply(vec![
        0xF3u8, 0x00, 0x07, 0x01, 0x11, 0x01, 0x00, 0x00, 0x0C, 0x00,
    ]));

    let result = handle.open(1, 12).await;

    assert!(matches!(
        result,
        CommandResult::Failed(FailureReason::MalformedResponse(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_unknown_command_reply_is_malformed() {
    let (handle, _worker, mock) = start_arbiter(1000, 8);
    let mut reply = vec![0xF3u8, 0x00, 0x07, 0x01, 0x12, 0x01, 0x00, 0x00, 0x0C];
    reply.push(lrc(&reply[1..]));
    mock.enqueue(MockStep::reply(reply));

    let result = handle.open(1, 12).await;

    assert!(matches!(
        result,
        CommandResult::Failed(FailureReason::MalformedResponse(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_full_queue_is_busy() {
    let (handle, _worker, mock) = start_arbiter(5000, 1);
    mock.set_default(MockStep::echo().after(Duration::from_secs(1)));

    let first = handle.submit(1, 1).unwrap();
    wait_for_calls(&mock, 1).await;

    // The worker holds the first command; one slot remains
    let second = handle.submit(1, 2).unwrap();
    let third = handle.submit(1, 3);
    assert_eq!(third.unwrap_err(), FailureReason::Busy);

    assert_eq!(first.wait().await, CommandResult::Opened);
    assert_eq!(second.wait().await, CommandResult::Opened);
    assert_eq!(mock.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_expired_queued_request_is_never_sent() {
    let (handle, _worker, mock) = start_arbiter(5000, 4);
    mock.set_default(MockStep::echo().after(Duration::from_millis(500)));

    let first = handle.submit(1, 1).unwrap();
    wait_for_calls(&mock, 1).await;

    let deadline = Instant::now() + Duration::from_millis(100);
    let result = handle.open_with_deadline(1, 5, deadline).await;
    assert_eq!(result, CommandResult::Failed(FailureReason::Timeout));

    assert_eq!(first.wait().await, CommandResult::Opened);
    assert_eq!(handle.open(1, 7).await, CommandResult::Opened);

    let sent_locks: Vec<u8> = mock.writes().iter().map(|w| w.frame[DATA_OFFSET]).collect();
    assert_eq!(sent_locks, vec![1, 7]);
}

#[tokio::test(start_paused = true)]
async fn test_fault_then_recovery() {
    let (handle, _worker, mock) = start_arbiter(1000, 8);
    mock.enqueue(MockStep::fault("line dropped"));

    let result = handle.open(1, 12).await;
    match result {
        CommandResult::Failed(FailureReason::ChannelError(message)) => {
            assert!(message.contains("line dropped"));
        }
        other => panic!("expected channel error, got {other:?}"),
    }

    // Not retried, and the worker keeps serving
    assert_eq!(mock.call_count(), 1);
    assert_eq!(handle.open(1, 12).await, CommandResult::Opened);
}

#[tokio::test(start_paused = true)]
async fn test_results_match_submission_order() {
    let (handle, _worker, mock) = start_arbiter(1000, 8);
    mock.enqueue(MockStep::echo());
    mock.enqueue(MockStep::reply(
        FrameCodec::default().response_bytes(3, 2, 0x0001).unwrap(),
    ));
    mock.enqueue(MockStep::silent());

    let a = handle.submit(3, 1).unwrap();
    let b = handle.submit(3, 2).unwrap();
    let c = handle.submit(3, 3).unwrap();

    assert_eq!(a.wait().await, CommandResult::Opened);
    assert_eq!(
        b.wait().await,
        CommandResult::Failed(FailureReason::Rejected { return_code: 1 })
    );
    assert_eq!(c.wait().await, CommandResult::Failed(FailureReason::Timeout));
}

#[tokio::test(start_paused = true)]
async fn test_worker_drains_queue_after_handles_drop() {
    let (handle, worker, mock) = start_arbiter(1000, 8);

    let pending = handle.submit(1, 12).unwrap();
    drop(handle);

    assert_eq!(pending.wait().await, CommandResult::Opened);
    worker.join().await;
    assert_eq!(mock.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_stalled_channel_is_cut_off_after_command_timeout() {
    let calls = Arc::new(AtomicUsize::new(0));
    let channel = StalledChannel {
        calls: Arc::clone(&calls),
    };
    let config = ArbiterConfig {
        command_timeout: Duration::from_millis(250),
        queue_capacity: 8,
    };
    let (handle, _worker) = CommandArbiter::new(channel, FrameCodec::default(), config).start();

    let start = Instant::now();
    let result = handle.open(1, 12).await;
    let elapsed = start.elapsed();

    assert_eq!(result, CommandResult::Failed(FailureReason::Timeout));
    assert!(elapsed >= Duration::from_millis(250));
    assert!(elapsed <= Duration::from_millis(250) + TIMEOUT_GRACE);

    // The worker is free for the next command
    assert_eq!(
        handle.open(1, 13).await,
        CommandResult::Failed(FailureReason::Timeout)
    );
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_deadline_expiry_leaves_exchange_running() {
    let (handle, _worker, mock) = start_arbiter(5000, 4);
    mock.enqueue(MockStep::echo().after(Duration::from_millis(300)));

    let deadline = Instant::now() + Duration::from_millis(100);
    let result = handle.open_with_deadline(1, 12, deadline).await;
    assert_eq!(result, CommandResult::Failed(FailureReason::Timeout));
    assert_eq!(result.code(), "timeout");

    // The command on the line was not cut short by the caller leaving
    assert_eq!(handle.open(1, 13).await, CommandResult::Opened);
    let writes = mock.writes();
    assert_eq!(writes.len(), 2);
    let first = &writes[0];
    assert_eq!(
        first.finished.unwrap() - first.started,
        Duration::from_millis(300)
    );
}
