//! Kiosk state owned by the screen state machine.
//!
//! `KioskState` is the single source of truth for what the customer sees
//! and how much money is in the machine.  Only
//! [`KioskService`](crate::app::service::KioskService) mutates it.

use super::Screen;

/// Money in integer cents of the local currency.
pub type Cents = u32;

/// Convert cents to the decimal dollar value carried on the wire.
pub fn cents_to_dollars(cents: Cents) -> f64 {
    f64::from(cents) / 100.0
}

#[derive(Debug, Clone)]
pub struct KioskState {
    pub current_screen: Screen,
    /// Credited by coin pulses only; zeroed by a completed cycle.
    pub collected_cents: Cents,
    pub recipient_address: Option<String>,
    /// KAS price in USD.
    pub kaspa_price: f64,
    /// USD to local currency.
    pub usd_to_local_rate: f64,
}

impl KioskState {
    pub fn new(kaspa_price: f64, usd_to_local_rate: f64) -> Self {
        Self {
            current_screen: Screen::Welcome,
            collected_cents: 0,
            recipient_address: None,
            kaspa_price,
            usd_to_local_rate,
        }
    }

    pub fn has_funds(&self) -> bool {
        self.collected_cents > 0
    }

    pub fn has_address(&self) -> bool {
        self.recipient_address
            .as_deref()
            .is_some_and(|a| !a.is_empty())
    }

    /// Collected money expressed in KAS, at the current rates.
    pub fn amount_in_kaspa(&self) -> f64 {
        cents_to_dollars(self.collected_cents) / self.usd_to_local_rate / self.kaspa_price
    }
}
