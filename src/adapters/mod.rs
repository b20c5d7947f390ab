//! Adapters: concrete implementations of the port traits and platform glue.
//!
//! | Adapter  | Provides                 | Connects to                 |
//! |----------|--------------------------|-----------------------------|
//! | `fetcher`| fills `CachedRate`s      | price / FX HTTP feeds       |
//! | `linux`  | InputPin ×2, CodeReader  | gpio-cdev chip, i2c-dev bus |
//! | `rates`  | RateSource               | `fetcher` pollers           |
//! | `time`   | millisecond clock        | tokio monotonic clock       |

pub mod fetcher;
#[cfg(feature = "rpi")]
pub mod linux;
pub mod rates;
pub mod time;
