//! Fixed-cadence sampler for the button and coin-sense lines.
//!
//! Owns both input pins plus the [`ButtonDebouncer`], [`CoinEdgeDetector`]
//! and [`PulseWindow`].  Each [`poll`](HardwareSampler::poll) reads the
//! two lines once and returns the discrete events produced by that tick.
//!
//! A failed read is logged (once per fault episode, not every tick) and
//! treated as "no event from that line this tick".  The pulse window is
//! still polled so a coin already being counted is not lost.

use embedded_hal::digital::InputPin;
use heapless::Vec;
use log::{debug, info, warn};

use super::button::{ButtonDebouncer, ButtonEvent};
use super::coin::{CoinEdgeDetector, PulseWindow};
use crate::config::SignalTiming;
use crate::error::HardwareError;
use crate::fsm::context::Cents;

/// Discrete hardware events, at most one per line per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HardwareEvent {
    ButtonPressed,
    ButtonHeldForReset,
    CoinReceived(Cents),
}

pub type TickEvents = Vec<HardwareEvent, 2>;

pub struct HardwareSampler<B, C> {
    button_pin: B,
    coin_pin: C,
    button: ButtonDebouncer,
    edges: CoinEdgeDetector,
    window: PulseWindow,
    button_fault: bool,
    coin_fault: bool,
}

impl<B: InputPin, C: InputPin> HardwareSampler<B, C> {
    pub fn new(button_pin: B, coin_pin: C, timing: &SignalTiming) -> Self {
        Self {
            button_pin,
            coin_pin,
            button: ButtonDebouncer::new(timing.debounce_ms, timing.hold_to_reset_ms),
            edges: CoinEdgeDetector::new(timing.signal_min_ms, timing.signal_max_ms),
            window: PulseWindow::new(timing.pulse_window_ms),
            button_fault: false,
            coin_fault: false,
        }
    }

    /// Sample both lines once.
    pub fn poll(&mut self, now_ms: u64) -> TickEvents {
        let mut events = TickEvents::new();

        match self.read_button() {
            Ok(pressed) => {
                if let Some(ev) = self.button.update(pressed, now_ms) {
                    let ev = match ev {
                        ButtonEvent::Pressed => {
                            info!("Button pressed");
                            HardwareEvent::ButtonPressed
                        }
                        ButtonEvent::HeldForReset => {
                            info!("Button held for reset");
                            HardwareEvent::ButtonHeldForReset
                        }
                    };
                    // Capacity 2, one slot per line.
                    let _ = events.push(ev);
                }
            }
            Err(e) => self.note_fault(e),
        }

        match self.read_coin() {
            Ok(level) => {
                if let Some(edge) = self.edges.sample(level, now_ms) {
                    if let Some(width) = self.edges.on_edge(edge) {
                        self.window.record_pulse(now_ms);
                        debug!(
                            "Coin pulse {}ms, {} in window",
                            width,
                            self.window.pulse_count()
                        );
                    }
                }
            }
            Err(e) => self.note_fault(e),
        }

        if let Some(closed) = self.window.poll(now_ms) {
            match closed.value {
                Some(cents) => {
                    info!(
                        "Coin window closed: {} pulses = {} cents",
                        closed.pulse_count, cents
                    );
                    let _ = events.push(HardwareEvent::CoinReceived(cents));
                }
                None => warn!(
                    "Coin window closed with unrecognized pulse count {}",
                    closed.pulse_count
                ),
            }
        }

        events
    }

    /// Forwarded from the kiosk once a submission completes.
    pub fn suppress_hold(&mut self) {
        self.button.suppress_hold();
    }

    fn read_button(&mut self) -> Result<bool, HardwareError> {
        let level = self.button_pin.is_high().map_err(|e| {
            debug!("button read: {e:?}");
            HardwareError::ButtonRead
        });
        if level.is_ok() && self.button_fault {
            info!("Button line readable again");
            self.button_fault = false;
        }
        level
    }

    fn read_coin(&mut self) -> Result<bool, HardwareError> {
        let level = self.coin_pin.is_high().map_err(|e| {
            debug!("coin read: {e:?}");
            HardwareError::CoinRead
        });
        if level.is_ok() && self.coin_fault {
            info!("Coin line readable again");
            self.coin_fault = false;
        }
        level
    }

    fn note_fault(&mut self, e: HardwareError) {
        let flag = match e {
            HardwareError::CoinRead => &mut self.coin_fault,
            _ => &mut self.button_fault,
        };
        if !*flag {
            warn!("GPIO error: {e}");
            *flag = true;
        }
    }
}
