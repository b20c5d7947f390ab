//! Polled push-button debouncer with hold-to-reset detection.
//!
//! ## Hardware
//!
//! Momentary switch, line reads HIGH while pressed.  The sampler calls
//! [`ButtonDebouncer::update`] every poll tick with the raw level.
//!
//! ## Policy
//!
//! | Gesture       | Condition                                               | Event              |
//! |---------------|---------------------------------------------------------|--------------------|
//! | Press         | line HIGH, previously released, quiet >= debounce       | `Pressed`          |
//! | Hold to reset | first LOW read after the line stayed HIGH > hold period | `HeldForReset`     |
//!
//! The quiet timer restarts on every recognized press and on every LOW
//! read, so a press has to be held for the debounce period before it
//! counts and contact bounce around a release never registers.

/// Debounced button gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEvent {
    Pressed,
    HeldForReset,
}

pub struct ButtonDebouncer {
    debounce_ms: u64,
    hold_ms: u64,
    last_press_ms: u64,
    is_released: bool,
    /// Set once the press that is being released has been dealt with
    /// (hold reported, or suppressed by the kiosk).
    release_handled: bool,
}

impl ButtonDebouncer {
    pub fn new(debounce_ms: u64, hold_ms: u64) -> Self {
        Self {
            debounce_ms,
            hold_ms,
            last_press_ms: 0,
            is_released: true,
            release_handled: true,
        }
    }

    /// Feed one raw sample.  `now_ms` is monotonic milliseconds.
    pub fn update(&mut self, pressed: bool, now_ms: u64) -> Option<ButtonEvent> {
        let since = now_ms.saturating_sub(self.last_press_ms);

        if pressed {
            if self.is_released && since > self.debounce_ms {
                self.last_press_ms = now_ms;
                self.is_released = false;
                self.release_handled = false;
                return Some(ButtonEvent::Pressed);
            }
            return None;
        }

        if !self.release_handled && since > self.hold_ms {
            self.release_handled = true;
            return Some(ButtonEvent::HeldForReset);
        }
        self.is_released = true;
        self.last_press_ms = now_ms;
        None
    }

    /// Treat the current press as fully handled so that a stalled poll
    /// loop cannot turn it into a hold-to-reset afterwards.
    pub fn suppress_hold(&mut self) {
        self.release_handled = true;
    }
}
