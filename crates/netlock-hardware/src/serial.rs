//! Serial channel backed by a real port via the `serialport` crate.
//!
//! The port is opened once and held for the life of the process. Blocking
//! driver calls run on Tokio's blocking pool; the port handle is moved into
//! the blocking task for one exchange and moved back afterwards, so ownership
//! stays with this struct and no lock is needed.
//!
//! # Fault Handling
//!
//! - A timeout leaves the port open: the controller simply did not answer.
//! - Any other fault drops the port and triggers exactly one reopen attempt.
//!   The fault is still reported for the current command; the frame is never
//!   resent, since the lock may already have actuated.
//! - While degraded, each command makes one reopen attempt before failing, so
//!   the bridge recovers once the line is restored without looping on a dead
//!   device.
//!
//! # Cancellation
//!
//! `write_read` may be dropped mid-exchange (the arbiter bounds every call).
//! The blocking exchange still runs to its own deadline; the next call waits
//! for it and takes the port back before writing.

use crate::error::{ChannelError, Result};
use crate::traits::SerialChannel;
use crate::types::SerialSettings;
use bytes::Bytes;
use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{ErrorKind, Read, Write};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Read timeout used while opening, before the first exchange sets its own.
const OPEN_TIMEOUT: Duration = Duration::from_secs(1);

/// Serial line to the lock controllers.
pub struct SerialPortChannel {
    settings: SerialSettings,

    /// `None` while degraded or while an exchange holds the port
    port: Option<Box<dyn SerialPort>>,

    /// Exchange whose caller stopped waiting; owns the port until it finishes
    in_flight: Option<JoinHandle<(Box<dyn SerialPort>, Result<Bytes>)>>,
}

impl std::fmt::Debug for SerialPortChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialPortChannel")
            .field("settings", &self.settings)
            .field("open", &self.port.is_some())
            .field("in_flight", &self.in_flight.is_some())
            .finish()
    }
}

impl SerialPortChannel {
    /// Open the port.
    ///
    /// # Errors
    /// Returns `ChannelError::OpenFailed` if the device cannot be opened.
    pub async fn open(settings: SerialSettings) -> Result<Self> {
        let port = open_blocking(settings.clone()).await?;
        info!(port = %settings, "Successfully opened serial port");
        Ok(Self {
            settings,
            port: Some(port),
            in_flight: None,
        })
    }

    /// Open the port, or start degraded if that fails.
    ///
    /// The failure is logged; the first command will try to open the port
    /// again.
    pub async fn open_or_degraded(settings: SerialSettings) -> Self {
        match Self::open(settings.clone()).await {
            Ok(channel) => channel,
            Err(e) => {
                error!(port = %settings, error = %e, "Error opening serial port, starting degraded");
                Self {
                    settings,
                    port: None,
                    in_flight: None,
                }
            }
        }
    }

    pub fn settings(&self) -> &SerialSettings {
        &self.settings
    }

    /// Take the port back from an exchange whose caller went away.
    async fn reclaim(&mut self) {
        let Some(task) = self.in_flight.as_mut() else {
            return;
        };
        let joined = task.await;
        self.in_flight = None;

        match joined {
            Ok((port, Err(e))) if !e.is_timeout() => {
                warn!(port = %self.settings, error = %e, "Abandoned exchange faulted, dropping port");
                drop(port);
            }
            Ok((port, _)) => {
                debug!(port = %self.settings, "Reclaimed port from abandoned exchange");
                self.port = Some(port);
            }
            Err(e) => {
                error!(port = %self.settings, error = %e, "Abandoned serial exchange failed");
            }
        }
    }

    async fn reopen(&mut self) -> Result<()> {
        self.port = None;
        match open_blocking(self.settings.clone()).await {
            Ok(port) => {
                info!(port = %self.settings, "Serial port reopened");
                self.port = Some(port);
                Ok(())
            }
            Err(e) => {
                error!(port = %self.settings, error = %e, "Reopen failed, channel degraded");
                Err(e)
            }
        }
    }
}

impl SerialChannel for SerialPortChannel {
    async fn write_read(
        &mut self,
        frame: &[u8],
        response_len: usize,
        timeout: Duration,
    ) -> Result<Bytes> {
        self.reclaim().await;
        if self.port.is_none() {
            warn!(port = %self.settings, "Serial port not open, attempting to reopen");
            self.reopen().await?;
        }
        let Some(mut port) = self.port.take() else {
            return Err(ChannelError::disconnected(&self.settings.path));
        };

        let frame = frame.to_vec();
        let task = self.in_flight.insert(tokio::task::spawn_blocking(move || {
            let result = exchange(port.as_mut(), &frame, response_len, timeout);
            (port, result)
        }));
        let joined = task.await;
        self.in_flight = None;

        let (port, result) = match joined {
            Ok(pair) => pair,
            Err(e) => {
                error!(port = %self.settings, error = %e, "Serial worker thread failed");
                let _ = self.reopen().await;
                return Err(ChannelError::communication(format!(
                    "serial worker failed: {e}"
                )));
            }
        };

        match result {
            Ok(bytes) => {
                self.port = Some(port);
                Ok(bytes)
            }
            Err(e) if e.is_timeout() => {
                self.port = Some(port);
                Err(e)
            }
            Err(e) => {
                error!(port = %self.settings, error = %e, "Serial fault, reopening port");
                drop(port);
                // The reopen result only decides whether the next command
                // finds the line usable; this command fails either way.
                let _ = self.reopen().await;
                Err(e)
            }
        }
    }

    fn name(&self) -> &str {
        &self.settings.path
    }

    fn is_degraded(&self) -> bool {
        self.port.is_none() && self.in_flight.is_none()
    }
}

async fn open_blocking(settings: SerialSettings) -> Result<Box<dyn SerialPort>> {
    let path = settings.path.clone();
    tokio::task::spawn_blocking(move || open_port(&settings))
        .await
        .map_err(|e| ChannelError::open_failed(path, e.to_string()))?
}

fn open_port(settings: &SerialSettings) -> Result<Box<dyn SerialPort>> {
    serialport::new(&settings.path, settings.baud_rate)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .timeout(OPEN_TIMEOUT)
        .open()
        .map_err(|e| ChannelError::open_failed(&settings.path, e.to_string()))
}

/// One blocking write-then-read round trip.
fn exchange(
    port: &mut dyn SerialPort,
    frame: &[u8],
    response_len: usize,
    timeout: Duration,
) -> Result<Bytes> {
    let deadline = Instant::now() + timeout;

    // The previous exchange may have left a nearly expired read timeout
    port.set_timeout(timeout)?;

    // Late bytes from an earlier timed-out exchange must not be read as
    // this command's answer.
    port.clear(ClearBuffer::Input)?;

    port.write_all(frame)?;
    port.flush()?;
    debug!(bytes = frame.len(), "Frame written");

    let mut buf = vec![0u8; response_len];
    let mut filled = 0;
    while filled < response_len {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(ChannelError::timeout(timeout));
        }
        port.set_timeout(remaining)?;

        match port.read(&mut buf[filled..]) {
            Ok(0) => return Err(ChannelError::disconnected(port.name().unwrap_or_default())),
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::TimedOut => {
                return Err(ChannelError::timeout(timeout));
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }

    Ok(Bytes::from(buf))
}
