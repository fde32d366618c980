//! Process configuration, read once at startup.
//!
//! Settings come from an INI file (`app.conf` in the working directory, or
//! the path in `NETLOCK_CONFIG`) and from `NETLOCK_*` environment variables.
//! A variable wins over the file.
//!
//! ```ini
//! [serial]
//! USB_PORT = /dev/ttyUSB0
//! BAUDRATE = 9600
//! COMMAND_TIMEOUT_MS = 1000
//!
//! [server]
//! HOST = 0.0.0.0
//! PORT = 5000
//! QUEUE_CAPACITY = 32
//! REQUEST_DEADLINE_MS = 5000
//!
//! [protocol]
//! MAX_ADDRESS = 99
//! MAX_LOCK = 99
//! TERMINATOR = none
//!
//! [logging]
//! FILE = app.logs
//! ```
//!
//! Only `USB_PORT` and `BAUDRATE` are required. Section and key names are
//! case-insensitive.

use anyhow::{Context, Result, bail};
use ini::Ini;
use netlock_core::constants::{
    DEFAULT_COMMAND_TIMEOUT_MS, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_QUEUE_CAPACITY,
    DEFAULT_REQUEST_DEADLINE_MS, MAX_DEVICE_ADDRESS, MAX_LOCK_NUMBER,
};
use netlock_protocol::{AddressLimits, FrameCodec, ProtocolTable};
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Port value that selects the in-memory echoing line instead of a device.
pub const MOCK_PORT: &str = "mock";

/// Variable naming the configuration file.
pub const CONFIG_PATH_VAR: &str = "NETLOCK_CONFIG";

pub const DEFAULT_CONFIG_FILE: &str = "app.conf";
pub const DEFAULT_LOG_FILE: &str = "app.logs";

/// Value that turns an optional setting off (`TERMINATOR`, `FILE`).
const NONE: &str = "none";

/// One setting: its environment variable and its place in the file.
#[derive(Debug, Clone, Copy)]
struct Key {
    var: &'static str,
    section: &'static str,
    name: &'static str,
}

impl Key {
    const fn new(var: &'static str, section: &'static str, name: &'static str) -> Self {
        Self { var, section, name }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ([{}] {})", self.var, self.section, self.name)
    }
}

const USB_PORT: Key = Key::new("NETLOCK_USB_PORT", "serial", "USB_PORT");
const BAUDRATE: Key = Key::new("NETLOCK_BAUDRATE", "serial", "BAUDRATE");
const COMMAND_TIMEOUT: Key = Key::new("NETLOCK_COMMAND_TIMEOUT_MS", "serial", "COMMAND_TIMEOUT_MS");
const HOST: Key = Key::new("NETLOCK_HOST", "server", "HOST");
const PORT: Key = Key::new("NETLOCK_PORT", "server", "PORT");
const QUEUE_CAPACITY: Key = Key::new("NETLOCK_QUEUE_CAPACITY", "server", "QUEUE_CAPACITY");
const REQUEST_DEADLINE: Key =
    Key::new("NETLOCK_REQUEST_DEADLINE_MS", "server", "REQUEST_DEADLINE_MS");
const MAX_ADDRESS: Key = Key::new("NETLOCK_MAX_ADDRESS", "protocol", "MAX_ADDRESS");
const MAX_LOCK: Key = Key::new("NETLOCK_MAX_LOCK", "protocol", "MAX_LOCK");
const TERMINATOR: Key = Key::new("NETLOCK_TERMINATOR", "protocol", "TERMINATOR");
const LOG_FILE: Key = Key::new("NETLOCK_LOG_FILE", "logging", "FILE");

/// Environment first, then the file. Blank values count as unset.
struct Sources<'a, F> {
    env: F,
    file: Option<&'a Ini>,
}

impl<F> Sources<'_, F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: Key) -> Option<String> {
        let present = |value: &String| !value.trim().is_empty();
        (self.env)(key.var)
            .filter(present)
            .or_else(|| {
                self.file
                    .and_then(|ini| ini.get_from(Some(key.section), key.name))
                    .map(str::to_string)
                    .filter(present)
            })
            .map(|value| value.trim().to_string())
    }

    fn require(&self, key: Key) -> Result<String> {
        self.get(key).with_context(|| format!("{key} is not set"))
    }

    fn parse_or<T>(&self, key: Key, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        match self.get(key) {
            Some(value) => parse(key, &value),
            None => Ok(default),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    pub usb_port: String,
    pub baud_rate: u32,
    pub host: String,
    pub port: u16,
    pub command_timeout: Duration,
    pub queue_capacity: usize,
    pub request_deadline: Duration,
    pub table: ProtocolTable,
    pub limits: AddressLimits,

    /// `None` logs to the terminal only
    pub log_file: Option<PathBuf>,

    /// File the settings were read from, if any
    pub source: Option<PathBuf>,
}

impl BridgeConfig {
    /// Load from the configuration file and the process environment.
    ///
    /// A file named by `NETLOCK_CONFIG` must exist. Without it, `app.conf` is
    /// read when present and the environment alone is used otherwise.
    pub fn load() -> Result<Self> {
        let lookup = |var: &str| env::var(var).ok();

        let (path, named) = match lookup(CONFIG_PATH_VAR).filter(|path| !path.trim().is_empty()) {
            Some(path) => (PathBuf::from(path.trim()), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };
        let file = if named || path.exists() {
            Some(read_file(&path)?)
        } else {
            None
        };

        let mut config = Self::from_sources(lookup, file.as_ref())?;
        config.source = file.map(|_| path);
        Ok(config)
    }

    /// Build the configuration from an environment lookup and parsed file.
    pub fn from_sources<F>(env: F, file: Option<&Ini>) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let sources = Sources { env, file };

        let usb_port = sources.require(USB_PORT)?;
        let baud_rate: u32 = parse(BAUDRATE, &sources.require(BAUDRATE)?)?;
        if baud_rate == 0 {
            bail!("{BAUDRATE} must be greater than zero");
        }

        let host = sources.get(HOST).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = sources.parse_or(PORT, DEFAULT_PORT)?;

        let command_timeout = millis(
            COMMAND_TIMEOUT,
            sources.parse_or(COMMAND_TIMEOUT, DEFAULT_COMMAND_TIMEOUT_MS)?,
        )?;
        let request_deadline = millis(
            REQUEST_DEADLINE,
            sources.parse_or(REQUEST_DEADLINE, DEFAULT_REQUEST_DEADLINE_MS)?,
        )?;

        let queue_capacity = sources.parse_or(QUEUE_CAPACITY, DEFAULT_QUEUE_CAPACITY)?;
        if queue_capacity == 0 {
            bail!("{QUEUE_CAPACITY} must be at least 1");
        }

        let max_address = sources.parse_or(MAX_ADDRESS, MAX_DEVICE_ADDRESS)?;
        let max_lock = sources.parse_or(MAX_LOCK, MAX_LOCK_NUMBER)?;
        let limits = AddressLimits::new(max_address, max_lock)
            .with_context(|| format!("invalid {MAX_ADDRESS} or {MAX_LOCK}"))?;

        let terminator = match sources.get(TERMINATOR) {
            Some(value) => parse_terminator(&value)
                .with_context(|| format!("failed to parse {TERMINATOR}={value:?}"))?,
            None => None,
        };
        let table = ProtocolTable {
            terminator,
            ..ProtocolTable::default()
        };

        let log_file = match sources.get(LOG_FILE) {
            Some(value) if value.eq_ignore_ascii_case(NONE) => None,
            Some(value) => Some(PathBuf::from(value)),
            None => Some(PathBuf::from(DEFAULT_LOG_FILE)),
        };

        Ok(Self {
            usb_port,
            baud_rate,
            host,
            port,
            command_timeout,
            queue_capacity,
            request_deadline,
            table,
            limits,
            log_file,
            source: None,
        })
    }

    pub fn is_mock(&self) -> bool {
        self.usb_port.eq_ignore_ascii_case(MOCK_PORT)
    }

    /// `host:port`, with IPv6 hosts bracketed.
    pub fn listen_addr(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// Codec for the configured controller family and address range.
    pub fn codec(&self) -> FrameCodec {
        FrameCodec::new(self.table, self.limits)
    }
}

fn read_file(path: &Path) -> Result<Ini> {
    Ini::load_from_file(path)
        .with_context(|| format!("failed to read configuration file {}", path.display()))
}

fn parse<T>(key: Key, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .with_context(|| format!("failed to parse {key}={value:?}"))
}

fn millis(key: Key, ms: u64) -> Result<Duration> {
    if ms == 0 {
        bail!("{key} must be greater than zero");
    }
    Ok(Duration::from_millis(ms))
}

/// `none`, or one byte in hex with an optional `0x` prefix.
fn parse_terminator(value: &str) -> Result<Option<u8>> {
    if value.eq_ignore_ascii_case(NONE) {
        return Ok(None);
    }
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);
    Ok(Some(u8::from_str_radix(digits, 16)?))
}
