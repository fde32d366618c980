//! HTTP surface of the NetLock bridge.
//!
//! This crate exposes the command arbiter over HTTP with axum. It only
//! translates: path segments become validated addresses, and command outcomes
//! become status codes and JSON bodies. All hardware access goes through the
//! [`ArbiterHandle`](netlock_bridge::ArbiterHandle).
//!
//! # Example
//!
//! ```no_run
//! use netlock_bridge::{ArbiterConfig, CommandArbiter};
//! use netlock_hardware::mock::MockSerialChannel;
//! use netlock_network::{GatewayConfig, bind, router, serve};
//! use netlock_protocol::FrameCodec;
//!
//! # async fn example() -> netlock_network::Result<()> {
//! let (channel, _mock) = MockSerialChannel::new();
//! let (handle, worker) =
//!     CommandArbiter::new(channel, FrameCodec::default(), ArbiterConfig::default()).start();
//!
//! let listener = bind("0.0.0.0:5000").await?;
//! serve(listener, router(handle, GatewayConfig::default()), async {
//!     let _ = tokio::signal::ctrl_c().await;
//! })
//! .await?;
//! worker.join().await;
//! # Ok(())
//! # }
//! ```

mod error;
mod gateway;

pub use error::{GatewayError, Result};
pub use gateway::{GatewayConfig, OpenResponse, router, status_for};

use axum::Router;
use std::future::Future;
use tokio::net::TcpListener;
use tracing::info;

/// Bind the HTTP listener.
///
/// # Errors
/// Returns `GatewayError::Bind` if the address is invalid or in use.
pub async fn bind(addr: &str) -> Result<TcpListener> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| GatewayError::Bind {
            addr: addr.to_string(),
            source,
        })?;

    if let Ok(local) = listener.local_addr() {
        info!(addr = %local, "HTTP gateway listening");
    }
    Ok(listener)
}

/// Serve `app` until `shutdown` completes.
///
/// In-flight requests are allowed to finish; dropping the router afterwards
/// releases its arbiter handle.
///
/// # Errors
/// Returns `GatewayError::Serve` if the server fails.
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(GatewayError::Serve)?;

    info!("HTTP gateway stopped");
    Ok(())
}
