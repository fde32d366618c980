//! netlock - HTTP to RS-485 lock controller bridge.

mod config;

use anyhow::{Context, Result};
use config::BridgeConfig;
use netlock_bridge::{ArbiterConfig, CommandArbiter};
use netlock_hardware::mock::MockSerialChannel;
use netlock_hardware::{AnySerialChannel, SerialChannel, SerialPortChannel, SerialSettings};
use netlock_network::GatewayConfig;
use std::path::Path;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<()> {
    let config = BridgeConfig::load().context("failed to load configuration")?;
    // Held until exit so buffered lines reach the log file
    let _log_guard = init_tracing(config.log_file.as_deref())?;

    info!(
        version = netlock_core::VERSION,
        config_file = ?config.source,
        usb_port = %config.usb_port,
        baud_rate = config.baud_rate,
        listen = %config.listen_addr(),
        max_address = config.limits.max_address(),
        max_lock = config.limits.max_lock(),
        "starting netlock bridge"
    );

    let channel = open_channel(&config).await;
    if channel.is_degraded() {
        warn!(port = channel.name(), "serial line unavailable, open requests will fail until it returns");
    }

    let arbiter = CommandArbiter::new(
        channel,
        config.codec(),
        ArbiterConfig {
            command_timeout: config.command_timeout,
            queue_capacity: config.queue_capacity,
        },
    );
    let (handle, worker) = arbiter.start();

    let listener = netlock_network::bind(&config.listen_addr())
        .await
        .context("failed to bind HTTP listener")?;
    let app = netlock_network::router(
        handle,
        GatewayConfig {
            request_deadline: config.request_deadline,
        },
    );

    info!("netlock bridge started");
    netlock_network::serve(listener, app, shutdown_signal())
        .await
        .context("HTTP gateway failed")?;

    // The router held the last arbiter handle; the worker drains and exits
    worker.join().await;
    info!("netlock bridge stopped");
    Ok(())
}

async fn open_channel(config: &BridgeConfig) -> AnySerialChannel {
    if config.is_mock() {
        warn!("using mock serial line, no hardware will be driven");
        let (channel, _handle) = MockSerialChannel::new();
        return channel.into();
    }

    let settings = SerialSettings::new(config.usb_port.clone(), config.baud_rate);
    SerialPortChannel::open_or_degraded(settings).await.into()
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
    }
    info!("shutdown requested");
}

/// Terminal output plus, when configured, a plain-text log file.
fn init_tracing(log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let name = path
                .file_name()
                .with_context(|| format!("log file {} has no file name", path.display()))?;
            let dir = path
                .parent()
                .filter(|dir| !dir.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();
    Ok(guard)
}
