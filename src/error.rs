//! Unified error types for the kiosk controller.
//!
//! Each subsystem has its own small enum.  The top-level [`Error`] only
//! covers what can stop startup (opening peripherals, building the rate
//! feed clients).  Nothing here is fatal at runtime: the event loop logs
//! these and carries on (see the `runtime` module).

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum Error {
    Fetch(FetchError),
    /// A peripheral could not be opened at startup.
    Device {
        what: &'static str,
        detail: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetch(e) => write!(f, "rate feed: {e}"),
            Self::Device { what, detail } => write!(f, "opening {what}: {detail}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Hardware errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HardwareError {
    /// The button line could not be read this tick.
    ButtonRead,
    /// The coin-sense line could not be read this tick.
    CoinRead,
    /// An I2C transaction with the code reader failed.
    BusRead,
}

impl fmt::Display for HardwareError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ButtonRead => write!(f, "button GPIO read failed"),
            Self::CoinRead => write!(f, "coin GPIO read failed"),
            Self::BusRead => write!(f, "I2C bus read failed"),
        }
    }
}

impl std::error::Error for HardwareError {}

// ---------------------------------------------------------------------------
// Scan errors
// ---------------------------------------------------------------------------

/// Reasons a single read attempt produced no payload.  All of them are
/// retried until the scan deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanError {
    Bus(HardwareError),
    /// Declared length was zero: no code in view.
    Empty,
    /// Declared length exceeds the configured maximum.
    Oversized(u16),
    /// The blocking read task was cancelled or panicked.
    Interrupted,
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bus(e) => write!(f, "{e}"),
            Self::Empty => write!(f, "no code in view"),
            Self::Oversized(len) => write!(f, "declared length {len} too large"),
            Self::Interrupted => write!(f, "read task interrupted"),
        }
    }
}

impl std::error::Error for ScanError {}

impl From<HardwareError> for ScanError {
    fn from(e: HardwareError) -> Self {
        Self::Bus(e)
    }
}

// ---------------------------------------------------------------------------
// Submission errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum SubmitError {
    /// The external program could not be started.
    Spawn(std::io::Error),
    /// Reading the program's output failed mid-run.
    Io(std::io::Error),
    /// The run exceeded its time budget.
    TimedOut,
    /// The program exited without a success or error marker.
    NoTerminalMarker,
}

impl fmt::Display for SubmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spawn(e) => write!(f, "failed to start submission program: {e}"),
            Self::Io(e) => write!(f, "reading submission output: {e}"),
            Self::TimedOut => write!(f, "submission timed out"),
            Self::NoTerminalMarker => write!(f, "submission ended without a terminal marker"),
        }
    }
}

impl std::error::Error for SubmitError {}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    /// A field failed range validation.  Names the field and the rule.
    Validation(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "reading config file: {e}"),
            Self::Parse(e) => write!(f, "parsing config file: {e}"),
            Self::Validation(msg) => write!(f, "validation failed: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// Rate feed errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum FetchError {
    /// The HTTP client could not be built.
    Client(reqwest::Error),
    /// Request failed, returned a non-success status, or the body was not JSON.
    Http(reqwest::Error),
    /// The body parsed but held no usable value at the configured key.
    MissingValue {
        key: String,
        sub_key: Option<String>,
    },
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Client(e) => write!(f, "building HTTP client: {e}"),
            Self::Http(e) => write!(f, "request failed: {e}"),
            Self::MissingValue { key, sub_key: Some(sub) } => {
                write!(f, "no positive number at {key}.{sub}")
            }
            Self::MissingValue { key, sub_key: None } => {
                write!(f, "no positive number at {key}")
            }
        }
    }
}

impl std::error::Error for FetchError {}

impl From<FetchError> for Error {
    fn from(e: FetchError) -> Self {
        Self::Fetch(e)
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
