//! Sampler → KioskService pipeline on a simulated clock.
//!
//! Drives the mock button and coin lines tick by tick, feeds whatever the
//! sampler reports into the service and resolves scan / submission effects
//! by hand, the way the runtime would.

use changeomatic::app::commands::{Effect, KioskEvent};
use changeomatic::app::events::DisplayEvent;
use changeomatic::app::service::KioskService;
use changeomatic::config::KioskConfig;
use changeomatic::drivers::sampler::HardwareSampler;
use changeomatic::fsm::Screen;
use changeomatic::scan::ScanOutcome;
use changeomatic::submit::{SubmitOutcome, SubmitRequest};

use crate::mock_hw::{MockLine, RecordingSink};

const TICK_MS: u64 = 2;

struct Bench {
    sampler: HardwareSampler<MockLine, MockLine>,
    service: KioskService,
    button: MockLine,
    coin: MockLine,
    sink: RecordingSink,
    effects: Vec<Effect>,
    now: u64,
}

impl Bench {
    fn new() -> Self {
        let config = KioskConfig::default();
        let button = MockLine::new(false);
        let coin = MockLine::new(true);
        let sampler = HardwareSampler::new(button.clone(), coin.clone(), &config.timing);
        let mut service = KioskService::new(&config);
        let sink = RecordingSink::new();
        service.start(&sink);
        let mut bench = Self {
            sampler,
            service,
            button,
            coin,
            sink,
            effects: Vec::new(),
            now: 0,
        };
        bench.run_for(500);
        bench
    }

    fn run_for(&mut self, ms: u64) {
        let end = self.now + ms;
        while self.now < end {
            self.now += TICK_MS;
            for ev in self.sampler.poll(self.now) {
                self.feed(ev.into());
            }
        }
    }

    fn feed(&mut self, event: KioskEvent) {
        if let Some(effect) = self.service.handle(event, &self.sink) {
            if effect == Effect::SuppressHold {
                self.sampler.suppress_hold();
            }
            self.effects.push(effect);
        }
    }

    fn press(&mut self) {
        self.button.set(true);
        self.run_for(150);
        self.button.set(false);
        self.run_for(50);
    }

    /// One coin: `pulses` LOW pulses of 30 ms, then wait for the window.
    fn insert_coin(&mut self, pulses: u32) {
        for _ in 0..pulses {
            self.coin.set(false);
            self.run_for(30);
            self.coin.set(true);
            self.run_for(30);
        }
        self.run_for(250);
    }

    fn press_until(&mut self, screen: Screen) {
        for _ in 0..8 {
            if self.service.screen() == screen {
                return;
            }
            self.press();
        }
        assert_eq!(self.service.screen(), screen);
    }

    fn last_effect(&self) -> Option<&Effect> {
        self.effects.last()
    }

    fn scan_started(&self) -> u64 {
        match self.last_effect() {
            Some(Effect::StartScan { generation }) => *generation,
            other => panic!("expected StartScan, got {other:?}"),
        }
    }

    fn coin_totals(&self) -> Vec<f64> {
        self.sink
            .events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                DisplayEvent::CoinUpdate { total_collected, .. } => Some(*total_collected),
                _ => None,
            })
            .collect()
    }
}

#[test]
fn full_cycle_from_coin_to_submission() {
    let mut b = Bench::new();
    b.press_until(Screen::InsertCoin);
    b.insert_coin(1);
    assert_eq!(b.coin_totals(), [1.0]);

    b.press();
    assert_eq!(b.service.screen(), Screen::ConfirmAmount);
    b.press();
    assert_eq!(b.service.screen(), Screen::ScanWallet);
    assert_eq!(b.sink.count("clear-error-logs"), 1);
    let generation = b.scan_started();

    b.feed(KioskEvent::ScanResolved {
        generation,
        outcome: ScanOutcome::Payload("kaspa:qflow".into()),
    });
    assert_eq!(b.service.screen(), Screen::Processing);
    assert_eq!(
        b.last_effect(),
        Some(&Effect::Submit(SubmitRequest {
            amount: "0.00001000".into(),
            address: "kaspa:qflow".into(),
        }))
    );

    b.feed(KioskEvent::SubmissionResolved(SubmitOutcome::Success));
    assert_eq!(b.last_effect(), Some(&Effect::SuppressHold));
    assert_eq!(b.coin_totals(), [1.0, 0.0]);
    assert_eq!(b.service.state().collected_cents, 0);
    assert_eq!(b.service.state().recipient_address, None);

    b.press();
    assert_eq!(b.service.screen(), Screen::Welcome);
    assert_eq!(
        b.sink.screens(),
        [
            "welcome",
            "wallet",
            "insert-coin",
            "confirm-amount",
            "scan-wallet",
            "processing",
            "welcome",
        ]
    );
}

#[test]
fn pulse_counts_map_to_denominations() {
    let mut b = Bench::new();
    b.insert_coin(2);
    b.insert_coin(3);
    b.insert_coin(5);
    assert_eq!(b.service.state().collected_cents, 200 + 1 + 3);
}

#[test]
fn unknown_pulse_count_credits_nothing() {
    let mut b = Bench::new();
    b.insert_coin(6);
    assert_eq!(b.service.state().collected_cents, 0);
    assert_eq!(b.sink.count("coin-update"), 0);
}

#[test]
fn insert_coin_press_needs_funds() {
    let mut b = Bench::new();
    b.press_until(Screen::InsertCoin);
    b.press();
    assert_eq!(b.service.screen(), Screen::InsertCoin);
    b.insert_coin(1);
    b.press();
    assert_eq!(b.service.screen(), Screen::ConfirmAmount);
}

#[test]
fn holding_the_button_resets_to_welcome() {
    let mut b = Bench::new();
    b.press_until(Screen::InsertCoin);
    b.insert_coin(1);

    b.button.set(true);
    b.run_for(4200);
    b.button.set(false);
    b.run_for(50);

    assert_eq!(b.service.screen(), Screen::Welcome);
    assert_eq!(b.sink.screens().last(), Some(&"welcome"));
    // Money already inserted survives the reset.
    assert_eq!(b.service.state().collected_cents, 100);
}

#[test]
fn leaving_scan_cancels_and_ignores_late_result() {
    let mut b = Bench::new();
    b.press_until(Screen::InsertCoin);
    b.insert_coin(1);
    b.press();
    b.press();
    let generation = b.scan_started();

    b.press();
    assert_eq!(b.service.screen(), Screen::ErrorPage);
    assert_eq!(b.last_effect(), Some(&Effect::CancelScan));

    let before = b.sink.events.borrow().len();
    b.feed(KioskEvent::ScanResolved {
        generation,
        outcome: ScanOutcome::Payload("kaspa:qlate".into()),
    });
    assert_eq!(b.sink.events.borrow().len(), before);
    assert_eq!(b.service.screen(), Screen::ErrorPage);
}

#[test]
fn scan_timeout_without_address_reports_missing_address() {
    let mut b = Bench::new();
    b.press_until(Screen::InsertCoin);
    b.insert_coin(1);
    b.press();
    b.press();
    let generation = b.scan_started();

    b.feed(KioskEvent::ScanResolved {
        generation,
        outcome: ScanOutcome::TimedOut,
    });
    match b.sink.last() {
        Some(DisplayEvent::ScreenChange {
            screen: Screen::ErrorPage,
            notification: Some(msg),
        }) => assert!(msg.contains("wrong or missing")),
        other => panic!("unexpected {other:?}"),
    }

    // A press on the error page starts a fresh scan.
    b.press();
    assert_eq!(b.service.screen(), Screen::ScanWallet);
    assert!(b.scan_started() > generation);
}

#[test]
fn coins_during_submission_are_credited_afterwards() {
    let mut b = Bench::new();
    b.press_until(Screen::InsertCoin);
    b.insert_coin(1);
    b.press();
    b.press();
    let generation = b.scan_started();
    b.feed(KioskEvent::ScanResolved {
        generation,
        outcome: ScanOutcome::Payload("kaspa:qdefer".into()),
    });
    assert!(b.service.submission_in_flight());

    b.insert_coin(2);
    assert_eq!(b.coin_totals(), [1.0]);

    b.press();
    assert_eq!(b.service.screen(), Screen::Processing);

    b.feed(KioskEvent::SubmissionResolved(SubmitOutcome::Success));
    assert_eq!(b.coin_totals(), [1.0, 0.0, 2.0]);
    assert_eq!(b.service.state().collected_cents, 200);
}

#[test]
fn failed_submission_keeps_the_money() {
    let mut b = Bench::new();
    b.press_until(Screen::InsertCoin);
    b.insert_coin(2);
    b.press();
    b.press();
    let generation = b.scan_started();
    b.feed(KioskEvent::ScanResolved {
        generation,
        outcome: ScanOutcome::Payload("kaspa:qfail".into()),
    });
    b.feed(KioskEvent::SubmissionResolved(SubmitOutcome::Failure));

    assert!(!b.service.submission_in_flight());
    assert_eq!(b.service.state().collected_cents, 200);
    assert_eq!(b.coin_totals(), [2.0]);
    assert_eq!(b.service.screen(), Screen::ErrorPage);
    match b.sink.last() {
        Some(DisplayEvent::ScreenChange {
            screen: Screen::ErrorPage,
            notification: Some(msg),
        }) => assert!(msg.contains("coins are safe")),
        other => panic!("unexpected {other:?}"),
    }

    b.press();
    assert_eq!(b.service.screen(), Screen::ScanWallet);
    b.scan_started();
}

#[test]
fn broken_button_line_does_not_block_coins() {
    let mut b = Bench::new();
    b.button.set_broken(true);
    b.insert_coin(1);
    assert_eq!(b.service.state().collected_cents, 100);
    assert_eq!(b.service.screen(), Screen::Welcome);

    b.button.set_broken(false);
    b.press();
    assert_eq!(b.service.screen(), Screen::WalletPrompt);
}
