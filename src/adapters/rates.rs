//! In-process rate cache.
//!
//! [`CachedRate`] is the [`RateSource`] the runtime reads on every exchange
//! tick.  The feed poller in `fetcher` holds a clone and calls
//! [`set`](CachedRate::set); until then `get()` is `None` and the kiosk
//! keeps its fallback value.

use std::sync::{Arc, Mutex};

use log::warn;

use crate::app::ports::RateSource;

#[derive(Debug, Clone, Default)]
pub struct CachedRate {
    value: Arc<Mutex<Option<f64>>>,
}

impl CachedRate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeded with a known value.
    pub fn with_value(value: f64) -> Self {
        let rate = Self::new();
        rate.set(value);
        rate
    }

    /// Store a freshly polled value.  Non-finite or non-positive values
    /// are rejected and the previous one kept.
    pub fn set(&self, value: f64) {
        if !value.is_finite() || value <= 0.0 {
            warn!("Ignoring invalid rate {value}");
            return;
        }
        if let Ok(mut slot) = self.value.lock() {
            *slot = Some(value);
        }
    }
}

impl RateSource for CachedRate {
    fn get(&self) -> Option<f64> {
        self.value.lock().ok().and_then(|slot| *slot)
    }
}
