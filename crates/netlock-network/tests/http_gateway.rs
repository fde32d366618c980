//! End-to-end tests: HTTP request -> arbiter -> mock serial line -> HTTP response.

use netlock_bridge::{ArbiterConfig, ArbiterHandle, CommandArbiter};
use netlock_hardware::mock::{MockSerialChannel, MockSerialHandle, MockStep};
use netlock_network::{GatewayConfig, OpenResponse, bind, router, serve};
use netlock_protocol::FrameCodec;
use reqwest::StatusCode;
use std::time::Duration;

struct TestBridge {
    base_url: String,
    arbiter: ArbiterHandle,
    mock: MockSerialHandle,
}

async fn start_bridge(command_timeout: Duration, queue_capacity: usize) -> TestBridge {
    let (channel, mock) = MockSerialChannel::new();
    let config = ArbiterConfig {
        command_timeout,
        queue_capacity,
    };
    let (arbiter, _worker) = CommandArbiter::new(channel, FrameCodec::default(), config).start();

    let listener = bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(arbiter.clone(), GatewayConfig::default());
    tokio::spawn(serve(listener, app, std::future::pending()));

    TestBridge {
        base_url: format!("http://{addr}"),
        arbiter,
        mock,
    }
}

async fn get_open(bridge: &TestBridge, path: &str) -> (StatusCode, OpenResponse) {
    let response = reqwest::get(format!("{}{path}", bridge.base_url))
        .await
        .unwrap();
    let status = response.status();
    let body = response.json::<OpenResponse>().await.unwrap();
    (status, body)
}

#[tokio::test]
async fn test_open_success() {
    let bridge = start_bridge(Duration::from_secs(1), 8).await;

    let (status, body) = get_open(&bridge, "/open/01/12").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.status, "success");
    assert_eq!(body.code, "opened");
    assert_eq!(body.message, "Door 12 on device 01 opened.");

    let writes = bridge.mock.writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(
        &writes[0].frame[..],
        &[0xF3, 0x00, 0x07, 0x01, 0x11, 0x01, 0x00, 0x00, 0x0C, 0x1A]
    );
}

#[tokio::test]
async fn test_single_digit_segments() {
    let bridge = start_bridge(Duration::from_secs(1), 8).await;

    let (status, body) = get_open(&bridge, "/open/1/3").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.message, "Door 3 on device 01 opened.");
}

#[tokio::test]
async fn test_invalid_segments_are_bad_requests() {
    let bridge = start_bridge(Duration::from_secs(1), 8).await;

    let (status, body) = get_open(&bridge, "/open/ab/12").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body.status, "error");
    assert_eq!(body.code, "invalid_address");

    let (status, body) = get_open(&bridge, "/open/01/xyz").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body.code, "invalid_lock_number");

    let (status, body) = get_open(&bridge, "/open/100/1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body.code, "invalid_address");

    assert_eq!(bridge.mock.call_count(), 0);
}

#[tokio::test]
async fn test_nack_is_conflict() {
    let bridge = start_bridge(Duration::from_secs(1), 8).await;
    let nack = FrameCodec::default().response_bytes(1, 12, 0x0002).unwrap();
    bridge.mock.enqueue(MockStep::reply(nack));

    let (status, body) = get_open(&bridge, "/open/01/12").await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body.code, "rejected");
}

#[tokio::test]
async fn test_silent_controller_is_gateway_timeout() {
    let bridge = start_bridge(Duration::from_millis(50), 8).await;
    bridge.mock.enqueue(MockStep::silent());

    let (status, body) = get_open(&bridge, "/open/01/12").await;

    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(body.code, "timeout");
}

#[tokio::test]
async fn test_channel_fault_is_bad_gateway() {
    let bridge = start_bridge(Duration::from_secs(1), 8).await;
    bridge.mock.enqueue(MockStep::fault("device unplugged"));

    let (status, body) = get_open(&bridge, "/open/01/12").await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body.code, "channel_error");
    assert!(body.message.contains("device unplugged"));
}

#[tokio::test]
async fn test_full_queue_is_service_unavailable() {
    let bridge = start_bridge(Duration::from_secs(5), 1).await;
    bridge
        .mock
        .set_default(MockStep::echo().after(Duration::from_millis(500)));

    // Occupy the line, then fill the single queue slot
    let in_flight = bridge.arbiter.submit(1, 1).unwrap();
    while bridge.mock.call_count() == 0 {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    let queued = bridge.arbiter.submit(1, 2).unwrap();

    let (status, body) = get_open(&bridge, "/open/01/03").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body.code, "busy");

    assert!(in_flight.wait().await.is_opened());
    assert!(queued.wait().await.is_opened());
    assert_eq!(bridge.mock.call_count(), 2);
}

#[tokio::test]
async fn test_health() {
    let bridge = start_bridge(Duration::from_secs(1), 8).await;

    let response = reqwest::get(format!("{}/health", bridge.base_url))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body, serde_json::json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let bridge = start_bridge(Duration::from_secs(1), 8).await;

    let response = reqwest::get(format!("{}/close/01/12", bridge.base_url))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(bridge.mock.call_count(), 0);
}
