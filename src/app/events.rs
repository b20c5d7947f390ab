//! Outbound display events.
//!
//! Every event is serialized as `{"event": <name>, "data": {...}}`, the
//! envelope the remote display client switches on.

use serde::Serialize;

use crate::fsm::Screen;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum DisplayEvent {
    ScreenChange {
        screen: Screen,
        #[serde(skip_serializing_if = "Option::is_none")]
        notification: Option<String>,
    },

    /// `amount` is the credit just applied, `total_collected` the running
    /// total.  Both in local-currency dollars.
    CoinUpdate { amount: f64, total_collected: f64 },

    ExchangeUpdate { kaspa_price: f64, usd_to_aud: f64 },

    /// One progress line from the submission program.
    SubmitLog {
        #[serde(rename = "type")]
        kind: String,
        message: String,
    },

    /// Exactly one per submission run.
    SubmitOutcome { result: bool },

    ClearErrorLogs {},
}

impl DisplayEvent {
    pub fn screen(screen: Screen) -> Self {
        Self::ScreenChange {
            screen,
            notification: None,
        }
    }

    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ScreenChange { .. } => "screen-change",
            Self::CoinUpdate { .. } => "coin-update",
            Self::ExchangeUpdate { .. } => "exchange-update",
            Self::SubmitLog { .. } => "submit-log",
            Self::SubmitOutcome { .. } => "submit-outcome",
            Self::ClearErrorLogs {} => "clear-error-logs",
        }
    }

    /// Serialize to the JSON envelope.
    pub fn to_message(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
