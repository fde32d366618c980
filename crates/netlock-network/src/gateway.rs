//! HTTP gateway in front of the command arbiter.
//!
//! # Routes
//!
//! | Method | Path | Purpose |
//! |---|---|---|
//! | GET | `/open/{address}/{lock}` | Open one lock, e.g. `/open/01/12` |
//! | GET | `/health` | Liveness probe |
//!
//! Every open request gets a JSON body:
//!
//! ```json
//! {"status": "success", "code": "opened", "message": "Door 12 on device 01 opened."}
//! ```
//!
//! # Status Mapping
//!
//! | Outcome | HTTP |
//! |---|---|
//! | `opened` | 200 |
//! | `invalid_address`, `invalid_lock_number` | 400 |
//! | `rejected` | 409 |
//! | `malformed_response`, `channel_error` | 502 |
//! | `busy` | 503 |
//! | `timeout` | 504 |

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use netlock_bridge::{ArbiterHandle, CommandResult, FailureReason};
use netlock_core::constants::DEFAULT_REQUEST_DEADLINE_MS;
use netlock_core::{DeviceAddress, LockNumber};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

/// Gateway settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatewayConfig {
    /// How long one HTTP request may wait for its command, queueing included.
    pub request_deadline: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            request_deadline: Duration::from_millis(DEFAULT_REQUEST_DEADLINE_MS),
        }
    }
}

/// JSON body returned by `/open`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenResponse {
    /// `"success"` or `"error"`
    pub status: String,

    /// Stable result code
    pub code: String,

    /// Human readable outcome
    pub message: String,
}

impl OpenResponse {
    fn opened(address: DeviceAddress, lock: LockNumber) -> Self {
        Self {
            status: "success".to_string(),
            code: "opened".to_string(),
            message: format!("Door {} on device {address} opened.", lock.as_u8()),
        }
    }

    fn failed(reason: &FailureReason) -> Self {
        Self {
            status: "error".to_string(),
            code: reason.code().to_string(),
            message: reason.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
}

#[derive(Clone)]
struct GatewayState {
    arbiter: ArbiterHandle,
    config: GatewayConfig,
}

/// Build the gateway router.
///
/// # Examples
///
/// ```no_run
/// use netlock_bridge::{ArbiterConfig, CommandArbiter};
/// use netlock_hardware::mock::MockSerialChannel;
/// use netlock_network::{GatewayConfig, router};
/// use netlock_protocol::FrameCodec;
///
/// # async fn example() -> std::io::Result<()> {
/// let (channel, _mock) = MockSerialChannel::new();
/// let (handle, _worker) =
///     CommandArbiter::new(channel, FrameCodec::default(), ArbiterConfig::default()).start();
///
/// let app = router(handle, GatewayConfig::default());
/// let listener = tokio::net::TcpListener::bind("127.0.0.1:5000").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```
pub fn router(arbiter: ArbiterHandle, config: GatewayConfig) -> Router {
    let state = GatewayState { arbiter, config };

    Router::new()
        .route("/open/{address}/{lock}", get(open_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

/// HTTP status for a command outcome.
pub fn status_for(result: &CommandResult) -> StatusCode {
    match result {
        CommandResult::Opened => StatusCode::OK,
        CommandResult::Failed(reason) => match reason {
            FailureReason::InvalidAddress(_) | FailureReason::InvalidLockNumber(_) => {
                StatusCode::BAD_REQUEST
            }
            FailureReason::Rejected { .. } => StatusCode::CONFLICT,
            FailureReason::MalformedResponse(_) | FailureReason::ChannelError(_) => {
                StatusCode::BAD_GATEWAY
            }
            FailureReason::Busy => StatusCode::SERVICE_UNAVAILABLE,
            FailureReason::Timeout => StatusCode::GATEWAY_TIMEOUT,
        },
    }
}

fn parse_target(address: &str, lock: &str) -> Result<(DeviceAddress, LockNumber), FailureReason> {
    let address = address.parse::<DeviceAddress>()?;
    let lock = lock.parse::<LockNumber>()?;
    Ok((address, lock))
}

async fn open_handler(
    State(state): State<GatewayState>,
    Path((address, lock)): Path<(String, String)>,
) -> (StatusCode, Json<OpenResponse>) {
    let (address, lock) = match parse_target(&address, &lock) {
        Ok(target) => target,
        Err(reason) => {
            debug!(%address, %lock, error = %reason, "Rejected open request");
            return (StatusCode::BAD_REQUEST, Json(OpenResponse::failed(&reason)));
        }
    };

    info!(%address, %lock, "Open requested");
    let deadline = Instant::now() + state.config.request_deadline;
    let result = state
        .arbiter
        .open_with_deadline(address.as_u8(), lock.as_u8(), deadline)
        .await;

    let body = match &result {
        CommandResult::Opened => OpenResponse::opened(address, lock),
        CommandResult::Failed(reason) => OpenResponse::failed(reason),
    };
    (status_for(&result), Json(body))
}

async fn health_handler() -> Json<Health> {
    Json(Health { status: "ok" })
}
