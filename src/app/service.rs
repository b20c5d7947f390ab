//! Kiosk service: the screen state machine.
//!
//! [`KioskService`] owns the [`KioskState`] and decides every transition.
//! It does no I/O: outbound messages go through an [`EventSink`], and
//! background work (QR scan, submission) is requested by returning an
//! [`Effect`] that the runtime executes and later answers with a
//! [`KioskEvent`].
//!
//! ```text
//!  HardwareSampler ──▶ ┌──────────────────┐ ──▶ EventSink (hub)
//!  scan / submit   ──▶ │   KioskService   │
//!  rate pollers    ──▶ │  KioskState      │ ──▶ Effect (runtime)
//!                      └──────────────────┘
//! ```
//!
//! ## Staleness
//!
//! Every screen change bumps a generation counter.  A scan carries the
//! generation it was started for and its result is dropped unless both
//! the generation and the screen still match.

use log::{debug, info, warn};

use crate::config::KioskConfig;
use crate::fsm::Screen;
use crate::fsm::context::{Cents, KioskState, cents_to_dollars};
use crate::scan::ScanOutcome;
use crate::submit::{SubmitOutcome, SubmitRequest};

use super::commands::{Effect, KioskEvent};
use super::events::DisplayEvent;
use super::ports::EventSink;

pub struct KioskService {
    state: KioskState,
    generation: u64,
    submission_in_flight: bool,
    /// Credits that arrived while a submission was running.
    deferred_cents: Cents,
    test_coin_cents: Option<Cents>,
}

impl KioskService {
    pub fn new(config: &KioskConfig) -> Self {
        Self {
            state: KioskState::new(
                config.exchange.fallback_kaspa_price,
                config.exchange.fallback_usd_to_local,
            ),
            generation: 0,
            submission_in_flight: false,
            deferred_cents: 0,
            test_coin_cents: config.test_coin_cents.filter(|_| cfg!(debug_assertions)),
        }
    }

    /// Announce the initial screen.
    pub fn start(&mut self, sink: &impl EventSink) {
        info!("Kiosk started on {}", self.state.current_screen);
        sink.emit(&DisplayEvent::screen(self.state.current_screen));
    }

    /// Apply one event.  Returns background work for the runtime, if any.
    pub fn handle(&mut self, event: KioskEvent, sink: &impl EventSink) -> Option<Effect> {
        match event {
            KioskEvent::ButtonPressed => self.on_press(sink),
            KioskEvent::ButtonHeldForReset => self.on_hold(sink),
            KioskEvent::CoinReceived(cents) => {
                self.on_coin(cents, sink);
                None
            }
            KioskEvent::ScanResolved {
                generation,
                outcome,
            } => self.on_scan(generation, outcome, sink),
            KioskEvent::SubmissionResolved(outcome) => self.on_submission(outcome, sink),
            KioskEvent::RatesPolled {
                kaspa_price,
                usd_to_local,
            } => {
                self.on_rates(kaspa_price, usd_to_local, sink);
                None
            }
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> &KioskState {
        &self.state
    }

    pub fn screen(&self) -> Screen {
        self.state.current_screen
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn submission_in_flight(&self) -> bool {
        self.submission_in_flight
    }

    // ── Button ────────────────────────────────────────────────

    fn on_press(&mut self, sink: &impl EventSink) -> Option<Effect> {
        if self.submission_in_flight {
            info!("Press ignored: submission in progress");
            return None;
        }

        match self.state.current_screen {
            Screen::InsertCoin => {
                if let Some(cents) = self.test_coin_cents {
                    info!("Adding test coin of {} cents", cents);
                    self.credit(cents, sink);
                }
                if self.state.has_funds() {
                    self.go_to(Screen::ConfirmAmount, None, sink);
                } else {
                    info!("Press ignored: no coins inserted yet");
                }
                None
            }
            Screen::ConfirmAmount | Screen::ErrorPage => {
                info!(
                    "Confirmed {:.2}, starting scan",
                    cents_to_dollars(self.state.collected_cents)
                );
                sink.emit(&DisplayEvent::ClearErrorLogs {});
                self.go_to(Screen::ScanWallet, None, sink);
                Some(Effect::StartScan {
                    generation: self.generation,
                })
            }
            current => {
                self.go_to(current.next_in_cycle(), None, sink);
                (current == Screen::ScanWallet).then_some(Effect::CancelScan)
            }
        }
    }

    fn on_hold(&mut self, sink: &impl EventSink) -> Option<Effect> {
        if self.submission_in_flight {
            info!("Hold ignored: submission in progress");
            return None;
        }
        let was_scanning = self.state.current_screen == Screen::ScanWallet;
        info!("Hold to reset: clearing recipient address");
        self.state.recipient_address = None;
        // Processing is transient here: it advances straight back to Welcome.
        self.state.current_screen = Screen::Processing;
        self.go_to(Screen::Processing.next_in_cycle(), None, sink);
        was_scanning.then_some(Effect::CancelScan)
    }

    // ── Coins ─────────────────────────────────────────────────

    fn on_coin(&mut self, cents: Cents, sink: &impl EventSink) {
        if self.submission_in_flight {
            self.deferred_cents += cents;
            info!(
                "Coin of {} cents held until submission completes ({} pending)",
                cents, self.deferred_cents
            );
            return;
        }
        self.credit(cents, sink);
    }

    fn credit(&mut self, cents: Cents, sink: &impl EventSink) {
        self.state.collected_cents += cents;
        info!(
            "Coin received: {:.2}. Total: {:.2}",
            cents_to_dollars(cents),
            cents_to_dollars(self.state.collected_cents)
        );
        sink.emit(&DisplayEvent::CoinUpdate {
            amount: cents_to_dollars(cents),
            total_collected: cents_to_dollars(self.state.collected_cents),
        });
    }

    // ── Scan resolution ───────────────────────────────────────

    fn on_scan(
        &mut self,
        generation: u64,
        outcome: ScanOutcome,
        sink: &impl EventSink,
    ) -> Option<Effect> {
        if generation != self.generation || self.state.current_screen != Screen::ScanWallet {
            debug!(
                "Discarding stale scan result (generation {} vs {}, screen {})",
                generation, self.generation, self.state.current_screen
            );
            return None;
        }

        let scanned = match outcome {
            ScanOutcome::Payload(address) => {
                info!("QR scan successful: {}", address);
                self.state.recipient_address = Some(address);
                true
            }
            ScanOutcome::TimedOut => {
                info!("QR scan timed out");
                false
            }
        };

        if !self.state.has_funds() {
            warn!(
                "Cannot submit: collected amount is {:.2}",
                cents_to_dollars(self.state.collected_cents)
            );
            let msg = format!(
                "${:.2}... Well, that's not much, /nbut you can add coins at any time, /nhow about now? ",
                cents_to_dollars(self.state.collected_cents)
            );
            self.go_to(Screen::ErrorPage, Some(msg), sink);
            return None;
        }
        if !self.state.has_address() {
            let shown = self.state.recipient_address.clone().unwrap_or_default();
            warn!("Cannot submit: recipient address missing ({:?})", shown);
            let msg = format!("The recipient address is wrong or missing. Look:  {shown}.");
            self.go_to(Screen::ErrorPage, Some(msg), sink);
            return None;
        }
        if !scanned {
            self.go_to(
                Screen::ErrorPage,
                Some(
                    "Ehhm...Something went wrong reading your QR-Code. /nTake your time, and hit the button to give it another try"
                        .to_string(),
                ),
                sink,
            );
            return None;
        }

        let request = SubmitRequest {
            amount: format!("{:.8}", self.state.amount_in_kaspa()),
            address: self.state.recipient_address.clone().unwrap_or_default(),
        };
        info!(
            "Requesting transaction: {:.2} local / {} KAS/USD / {} USD->local = {} KAS",
            cents_to_dollars(self.state.collected_cents),
            self.state.kaspa_price,
            self.state.usd_to_local_rate,
            request.amount
        );
        self.go_to(Screen::Processing, None, sink);
        self.submission_in_flight = true;
        Some(Effect::Submit(request))
    }

    // ── Submission resolution ─────────────────────────────────

    fn on_submission(&mut self, outcome: SubmitOutcome, sink: &impl EventSink) -> Option<Effect> {
        if !self.submission_in_flight {
            warn!("Submission outcome {:?} with no submission in flight", outcome);
        }
        self.submission_in_flight = false;

        if outcome == SubmitOutcome::Success {
            info!("Transaction complete, resetting collected amount and address");
            self.state.collected_cents = 0;
            self.state.recipient_address = None;
            sink.emit(&DisplayEvent::CoinUpdate {
                amount: 0.0,
                total_collected: 0.0,
            });
        } else {
            warn!("Transaction failed, keeping collected amount for retry");
            self.go_to(
                Screen::ErrorPage,
                Some(
                    "The transaction did not go through, /nyour coins are safe. Hit the button to try again"
                        .to_string(),
                ),
                sink,
            );
        }

        if self.deferred_cents > 0 {
            let cents = core::mem::take(&mut self.deferred_cents);
            self.credit(cents, sink);
        }
        Some(Effect::SuppressHold)
    }

    // ── Exchange rates ────────────────────────────────────────

    fn on_rates(
        &mut self,
        kaspa_price: Option<f64>,
        usd_to_local: Option<f64>,
        sink: &impl EventSink,
    ) {
        match kaspa_price {
            Some(p) if p > 0.0 => self.state.kaspa_price = p,
            _ => debug!("No Kaspa price yet, keeping {}", self.state.kaspa_price),
        }
        match usd_to_local {
            Some(r) if r > 0.0 => self.state.usd_to_local_rate = r,
            _ => debug!("No FX rate yet, keeping {}", self.state.usd_to_local_rate),
        }
        info!(
            "exchange-update: kaspa_price: {} usd_to_local: {}",
            self.state.kaspa_price, self.state.usd_to_local_rate
        );
        sink.emit(&DisplayEvent::ExchangeUpdate {
            kaspa_price: self.state.kaspa_price,
            usd_to_aud: self.state.usd_to_local_rate,
        });
    }

    // ── Internal ──────────────────────────────────────────────

    fn go_to(&mut self, next: Screen, notification: Option<String>, sink: &impl EventSink) {
        info!("Screen: {} -> {}", self.state.current_screen, next);
        self.state.current_screen = next;
        self.generation += 1;
        sink.emit(&DisplayEvent::ScreenChange {
            screen: next,
            notification,
        });
    }
}
