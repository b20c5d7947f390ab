//! Coin validator pulse decoding.
//!
//! The validator idles HIGH and emits N LOW pulses of ~30 ms per coin,
//! where N encodes the denomination.  Decoding is split in two:
//!
//! - [`CoinEdgeDetector`] turns raw samples into edges and measures the
//!   LOW time of each pulse, keeping only pulses inside the configured
//!   duration band.
//! - [`PulseWindow`] counts valid pulses in a fixed window that opens on
//!   the first pulse and closes exactly `window_ms` later, however many
//!   pulses arrive meanwhile.  The closed count goes through
//!   [`classify_pulses`].

use crate::fsm::context::Cents;

/// Pulse-count to denomination table (cents).
const DENOMINATIONS: [(u32, Cents); 5] = [
    (1, 100), // $1.00
    (2, 200), // $2.00
    (3, 1),   // $0.01
    (4, 2),   // $0.02
    (5, 3),   // $0.03
];

/// Map a closed window's pulse count to a denomination.
/// Counts outside the table carry no value.
pub fn classify_pulses(count: u32) -> Option<Cents> {
    DENOMINATIONS
        .iter()
        .find(|(pulses, _)| *pulses == count)
        .map(|(_, cents)| *cents)
}

/// A level transition on the coin-sense line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoinEdge {
    /// Level after the transition (`true` = HIGH).
    pub level: bool,
    pub at_ms: u64,
}

/// Detects edges and validates pulse width.
pub struct CoinEdgeDetector {
    min_ms: u64,
    max_ms: u64,
    prev_level: bool,
    fell_at_ms: Option<u64>,
}

impl CoinEdgeDetector {
    pub fn new(min_ms: u64, max_ms: u64) -> Self {
        Self {
            min_ms,
            max_ms,
            prev_level: true,
            fell_at_ms: None,
        }
    }

    /// Feed one raw sample; returns the edge if the level changed.
    pub fn sample(&mut self, level: bool, now_ms: u64) -> Option<CoinEdge> {
        if level == self.prev_level {
            return None;
        }
        self.prev_level = level;
        Some(CoinEdge { level, at_ms: now_ms })
    }

    /// Consume an edge.  Returns the pulse duration when a rising edge
    /// completes a pulse whose LOW time is within the accepted band.
    pub fn on_edge(&mut self, edge: CoinEdge) -> Option<u64> {
        if !edge.level {
            self.fell_at_ms = Some(edge.at_ms);
            return None;
        }
        let fell = self.fell_at_ms?;
        let duration = edge.at_ms.saturating_sub(fell);
        (self.min_ms..=self.max_ms)
            .contains(&duration)
            .then_some(duration)
    }
}

/// Outcome of a closed pulse window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClosedWindow {
    pub pulse_count: u32,
    /// `None` when the count is not a known denomination.
    pub value: Option<Cents>,
}

/// Fixed-length counting window.
#[derive(Debug, Default)]
pub struct PulseWindow {
    window_ms: u64,
    measuring: bool,
    start_ms: u64,
    pulse_count: u32,
}

impl PulseWindow {
    pub fn new(window_ms: u64) -> Self {
        Self {
            window_ms,
            ..Self::default()
        }
    }

    /// Count a valid pulse, opening the window if none is open.
    pub fn record_pulse(&mut self, at_ms: u64) {
        if self.measuring {
            self.pulse_count += 1;
        } else {
            self.measuring = true;
            self.start_ms = at_ms;
            self.pulse_count = 1;
        }
    }

    /// Close the window if `window_ms` has passed since it opened.
    pub fn poll(&mut self, now_ms: u64) -> Option<ClosedWindow> {
        if !self.measuring || now_ms.saturating_sub(self.start_ms) < self.window_ms {
            return None;
        }
        let pulse_count = self.pulse_count;
        self.measuring = false;
        self.pulse_count = 0;
        Some(ClosedWindow {
            pulse_count,
            value: classify_pulses(pulse_count),
        })
    }

    pub fn pulse_count(&self) -> u32 {
        self.pulse_count
    }
}
