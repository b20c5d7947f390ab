//! Kiosk configuration parameters
//!
//! All tunable parameters for the Change-o-matic kiosk.
//! Defaults match the reference hardware (Raspberry Pi, pulse-output coin
//! validator on GPIO 22, push-button on GPIO 17, Tiny Code Reader on I2C).
//! Values can be overridden by a JSON file named in `CHANGEOMATIC_CONFIG`.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Environment variable naming the optional JSON config file.
pub const CONFIG_ENV: &str = "CHANGEOMATIC_CONFIG";

/// Signal timing for the hardware sampler.  All values are milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalTiming {
    /// Sampling cadence of the button and coin lines (1–10 ms).
    pub poll_interval_ms: u64,
    /// Minimum quiet time before a new press is recognized (10–1000 ms).
    pub debounce_ms: u64,
    /// Press-and-hold duration that triggers a kiosk reset.
    pub hold_to_reset_ms: u64,
    /// Shortest LOW pulse accepted from the coin validator.
    pub signal_min_ms: u64,
    /// Longest LOW pulse accepted from the coin validator.
    pub signal_max_ms: u64,
    /// Pulse counting window, measured from the first valid pulse (50–2000 ms).
    pub pulse_window_ms: u64,
}

impl Default for SignalTiming {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2,
            debounce_ms: 90,
            hold_to_reset_ms: 4000,
            signal_min_ms: 22,
            signal_max_ms: 38,
            pulse_window_ms: 200,
        }
    }
}

/// Where the peripherals are attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HardwareConfig {
    pub gpio_chip: PathBuf,
    /// Push-button line (active HIGH).
    pub button_pin: u32,
    /// Coin validator pulse line (idle HIGH, pulses LOW).
    pub coin_pin: u32,
    pub i2c_bus: PathBuf,
    /// 7-bit I2C address of the QR code reader.
    pub code_reader_address: u8,
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            gpio_chip: PathBuf::from("/dev/gpiochip0"),
            button_pin: 17,
            coin_pin: 22,
            i2c_bus: PathBuf::from("/dev/i2c-1"),
            code_reader_address: 0x0C,
        }
    }
}

/// QR scan coordinator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub timeout_secs: u64,
    /// Pause between two read attempts.
    pub retry_interval_ms: u64,
    /// Largest payload the reader may declare (1–254 bytes).
    pub max_payload_len: u16,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 40,
            retry_interval_ms: 50,
            max_payload_len: 254,
        }
    }
}

/// External transaction-submission program.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmitConfig {
    /// Interpreter or executable to launch.
    pub program: PathBuf,
    /// Leading arguments passed before the flagged ones (usually the script path).
    pub args: Vec<String>,
    pub encoding: String,
    pub network: String,
    /// Upper bound on a single submission run.
    pub timeout_secs: u64,
    /// Optional resubmission monitor launched once at startup.
    pub monitor_script: Option<PathBuf>,
}

impl Default for SubmitConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("node"),
            args: vec!["simple-transaction.js".to_string()],
            encoding: "borsh".to_string(),
            network: "mainnet".to_string(),
            timeout_secs: 180,
            monitor_script: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8765)),
        }
    }
}

/// One HTTP rate feed.  The value is read from `body[key]` or
/// `body[key][sub_key]` and may be a JSON number or a numeric string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateFeedConfig {
    pub name: String,
    pub url: String,
    pub key: String,
    #[serde(default)]
    pub sub_key: Option<String>,
    #[serde(default = "default_feed_interval")]
    pub interval_secs: u64,
    /// Delay before the next attempt while no value has been fetched yet.
    #[serde(default = "default_feed_retry")]
    pub retry_secs: u64,
    #[serde(default = "default_feed_timeout")]
    pub request_timeout_secs: u64,
}

fn default_feed_interval() -> u64 {
    600
}

fn default_feed_retry() -> u64 {
    120
}

fn default_feed_timeout() -> u64 {
    10
}

/// Exchange-rate broadcast timer, the feeds behind it and the values used
/// before any poll succeeds.  A feed set to `null` is not polled.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
    pub initial_delay_secs: u64,
    pub interval_secs: u64,
    /// Deliberately high so a kiosk without price data sends dust, not a fortune.
    pub fallback_kaspa_price: f64,
    pub fallback_usd_to_local: f64,
    pub kaspa_price_feed: Option<RateFeedConfig>,
    pub usd_to_local_feed: Option<RateFeedConfig>,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            initial_delay_secs: 3,
            interval_secs: 600,
            fallback_kaspa_price: 100_000.0,
            fallback_usd_to_local: 1.0,
            kaspa_price_feed: Some(RateFeedConfig {
                name: "Kaspa".into(),
                url: "https://api.kaspa.org/info/price?stringOnly=false".into(),
                key: "price".into(),
                sub_key: None,
                interval_secs: 600,
                retry_secs: default_feed_retry(),
                request_timeout_secs: default_feed_timeout(),
            }),
            usd_to_local_feed: Some(RateFeedConfig {
                name: "USD/AUD".into(),
                url: "https://api.exchangerate-api.com/v4/latest/USD".into(),
                key: "rates".into(),
                sub_key: Some("AUD".into()),
                interval_secs: 900,
                retry_secs: default_feed_retry(),
                request_timeout_secs: default_feed_timeout(),
            }),
        }
    }
}

/// Core kiosk configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KioskConfig {
    pub timing: SignalTiming,
    pub hardware: HardwareConfig,
    pub scan: ScanConfig,
    pub submit: SubmitConfig,
    pub server: ServerConfig,
    pub exchange: ExchangeConfig,
    /// Credit added by a button press on the insert-coin screen.
    /// Only honored in debug builds.
    pub test_coin_cents: Option<u32>,
}

impl KioskConfig {
    /// Load from the file named by [`CONFIG_ENV`], or fall back to defaults.
    /// The result is always validated.
    pub fn load_from_env() -> Result<Self, ConfigError> {
        let config = match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::load(Path::new(&path))?,
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON config file.  Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(raw).map_err(ConfigError::Parse)
    }

    /// Reject out-of-range values instead of clamping them.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.timing;
        check(
            (1..=10).contains(&t.poll_interval_ms),
            "timing.poll_interval_ms must be 1..=10",
        )?;
        check(
            (10..=1000).contains(&t.debounce_ms),
            "timing.debounce_ms must be 10..=1000",
        )?;
        check(
            t.hold_to_reset_ms > t.debounce_ms,
            "timing.hold_to_reset_ms must exceed debounce_ms",
        )?;
        check(
            t.signal_min_ms > 0 && t.signal_min_ms < t.signal_max_ms,
            "timing.signal_min_ms must be non-zero and below signal_max_ms",
        )?;
        check(
            (50..=2000).contains(&t.pulse_window_ms),
            "timing.pulse_window_ms must be 50..=2000",
        )?;
        check(
            t.signal_max_ms < t.pulse_window_ms,
            "timing.signal_max_ms must be shorter than pulse_window_ms",
        )?;
        check(
            t.poll_interval_ms * 2 <= t.signal_min_ms,
            "timing.poll_interval_ms too coarse for signal_min_ms",
        )?;

        check(self.scan.timeout_secs > 0, "scan.timeout_secs must be non-zero")?;
        check(
            self.scan.retry_interval_ms > 0,
            "scan.retry_interval_ms must be non-zero",
        )?;
        check(
            (1..=254).contains(&self.scan.max_payload_len),
            "scan.max_payload_len must be 1..=254",
        )?;

        check(
            !self.submit.program.as_os_str().is_empty(),
            "submit.program must be set",
        )?;
        check(self.submit.timeout_secs > 0, "submit.timeout_secs must be non-zero")?;

        check(
            self.exchange.interval_secs > 0,
            "exchange.interval_secs must be non-zero",
        )?;
        check(
            self.exchange.fallback_kaspa_price > 0.0,
            "exchange.fallback_kaspa_price must be positive",
        )?;
        check(
            self.exchange.fallback_usd_to_local > 0.0,
            "exchange.fallback_usd_to_local must be positive",
        )?;
        for feed in [&self.exchange.kaspa_price_feed, &self.exchange.usd_to_local_feed]
            .into_iter()
            .flatten()
        {
            check(
                !feed.url.is_empty() && !feed.key.is_empty(),
                "exchange feed url and key must be set",
            )?;
            check(
                feed.interval_secs > 0 && feed.retry_secs > 0 && feed.request_timeout_secs > 0,
                "exchange feed intervals must be non-zero",
            )?;
        }
        Ok(())
    }
}

fn check(ok: bool, field: &'static str) -> Result<(), ConfigError> {
    if ok {
        Ok(())
    } else {
        Err(ConfigError::Validation(field))
    }
}
