//! Screen identity and the fixed advance order.
//!
//! ```text
//!  WELCOME ──▶ WALLET ──▶ INSERT-COIN ──[funds]──▶ CONFIRM-AMOUNT
//!     ▲                                                  │
//!     │                                               [press]
//!     │                                                  ▼
//!  PROCESSING ◀──[scan ok, funds, address]──────── SCAN-WALLET ◀──┐
//!                                                        │        │
//!                                  [scan failed / no funds / bad address]
//!                                                        ▼        │
//!                                                   ERROR-PAGE ───┘ [press]
//!
//!  Any screen ──[hold to reset]──▶ PROCESSING ──▶ WELCOME
//! ```
//!
//! The event-driven transitions live in [`crate::app::service`]; this
//! module only knows the screens and the cyclic fallback order used when a
//! press has no screen-specific meaning.

pub mod context;

use serde::{Deserialize, Serialize};

/// Every screen the remote display can show.  Serialized with the names the
/// display client switches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Screen {
    Welcome,
    #[serde(rename = "wallet")]
    WalletPrompt,
    InsertCoin,
    ConfirmAmount,
    ScanWallet,
    ErrorPage,
    Processing,
}

/// Fallback advance order.  `ScanWallet` appears twice; lookups use the
/// first occurrence, so a press on `ScanWallet` leads to `ErrorPage`.
pub const SCREEN_ORDER: [Screen; 8] = [
    Screen::Welcome,
    Screen::WalletPrompt,
    Screen::InsertCoin,
    Screen::ConfirmAmount,
    Screen::ScanWallet,
    Screen::ErrorPage,
    Screen::ScanWallet,
    Screen::Processing,
];

impl Screen {
    /// Wire name, as sent in `screen-change`.
    pub fn name(self) -> &'static str {
        match self {
            Self::Welcome => "welcome",
            Self::WalletPrompt => "wallet",
            Self::InsertCoin => "insert-coin",
            Self::ConfirmAmount => "confirm-amount",
            Self::ScanWallet => "scan-wallet",
            Self::ErrorPage => "error-page",
            Self::Processing => "processing",
        }
    }

    /// Next screen in [`SCREEN_ORDER`], wrapping around.
    pub fn next_in_cycle(self) -> Self {
        let idx = SCREEN_ORDER
            .iter()
            .position(|s| *s == self)
            .unwrap_or(SCREEN_ORDER.len() - 1);
        SCREEN_ORDER[(idx + 1) % SCREEN_ORDER.len()]
    }
}

impl core::fmt::Display for Screen {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}
