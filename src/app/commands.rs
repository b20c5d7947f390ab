//! Inbound events accepted by the [`KioskService`](super::service::KioskService).

use crate::drivers::sampler::HardwareEvent;
use crate::fsm::context::Cents;
use crate::scan::ScanOutcome;
use crate::submit::{SubmitOutcome, SubmitRequest};

#[derive(Debug, Clone, PartialEq)]
pub enum KioskEvent {
    ButtonPressed,
    ButtonHeldForReset,
    /// A closed pulse window classified as a known denomination.
    CoinReceived(Cents),
    /// A scan started for `generation` finished.
    ScanResolved {
        generation: u64,
        outcome: ScanOutcome,
    },
    SubmissionResolved(SubmitOutcome),
    /// Latest values from the price and FX pollers.
    RatesPolled {
        kaspa_price: Option<f64>,
        usd_to_local: Option<f64>,
    },
}

impl From<HardwareEvent> for KioskEvent {
    fn from(ev: HardwareEvent) -> Self {
        match ev {
            HardwareEvent::ButtonPressed => Self::ButtonPressed,
            HardwareEvent::ButtonHeldForReset => Self::ButtonHeldForReset,
            HardwareEvent::CoinReceived(cents) => Self::CoinReceived(cents),
        }
    }
}

/// Background work the service asks the runtime to perform.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Start a QR scan tagged with `generation`, replacing any running one.
    StartScan { generation: u64 },
    /// Abort the running scan, if any.
    CancelScan,
    /// Launch the submission program.
    Submit(SubmitRequest),
    /// Tell the sampler the current press is dealt with.
    SuppressHold,
}
