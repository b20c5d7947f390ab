//! Port traits: the boundary between the kiosk core and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ KioskService / coordinators (domain)
//! ```
//!
//! The core never touches sockets, child processes or the I2C bus directly;
//! it goes through these traits so every decision is testable with mocks.

use crate::error::HardwareError;

use super::events::DisplayEvent;

// ───────────────────────────────────────────────────────────────
// Event sink (domain → display clients)
// ───────────────────────────────────────────────────────────────

/// Receives every outbound [`DisplayEvent`].  The production implementation
/// is the [`BroadcastHub`](crate::hub::BroadcastHub); tests record them.
///
/// Takes `&self` because the sink is shared between the event loop and
/// the submission task.
pub trait EventSink {
    fn emit(&self, event: &DisplayEvent);
}

// ───────────────────────────────────────────────────────────────
// Rate source (external pollers → domain)
// ───────────────────────────────────────────────────────────────

/// Last known value of an externally polled price or exchange rate.
pub trait RateSource {
    /// `None` until the first successful poll.
    fn get(&self) -> Option<f64>;
}

// ───────────────────────────────────────────────────────────────
// Code reader (QR peripheral → scan coordinator)
// ───────────────────────────────────────────────────────────────

/// Chunked read primitive of the QR code peripheral.  Each call fills
/// `buf` starting from the beginning of the device's result buffer.
pub trait CodeReader {
    fn read(&mut self, buf: &mut [u8]) -> Result<(), HardwareError>;
}
