//! Kiosk event loop.
//!
//! One task multiplexes everything that can change [`KioskState`]:
//!
//! ```text
//!   poll tick ──────▶ HardwareSampler ──┐
//!   scan task ──────▶ ScanResolved ─────┤
//!   submit task ────▶ SubmissionResolved┼──▶ KioskService ──▶ Effect
//!   exchange tick ──▶ RatesPolled ──────┘         │
//!                                                  ▼
//!                                           BroadcastHub
//! ```
//!
//! Background tasks never touch the service; they report back over an
//! mpsc channel and the loop applies their result in order.
//!
//! [`KioskState`]: crate::fsm::context::KioskState

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use embedded_hal::digital::InputPin;
use log::{debug, info};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval, interval_at};

use crate::adapters::rates::CachedRate;
use crate::adapters::time::MonotonicClock;
use crate::app::commands::{Effect, KioskEvent};
use crate::app::ports::{CodeReader, RateSource};
use crate::app::service::KioskService;
use crate::config::KioskConfig;
use crate::drivers::sampler::HardwareSampler;
use crate::hub::BroadcastHub;
use crate::scan::QrScanCoordinator;
use crate::submit::TransactionSupervisor;

pub type SharedRate = Box<dyn RateSource + Send + Sync>;

pub struct KioskRuntime<B, C, R> {
    sampler: HardwareSampler<B, C>,
    service: KioskService,
    hub: Arc<BroadcastHub>,
    scanner: QrScanCoordinator<R>,
    supervisor: TransactionSupervisor,
    clock: MonotonicClock,
    kaspa_price: SharedRate,
    usd_to_local: SharedRate,
    poll_interval: Duration,
    exchange_delay: Duration,
    exchange_interval: Duration,
    scan_task: Option<JoinHandle<()>>,
    tx: UnboundedSender<KioskEvent>,
    rx: UnboundedReceiver<KioskEvent>,
}

impl<B, C, R> KioskRuntime<B, C, R>
where
    B: InputPin,
    C: InputPin,
    R: CodeReader + Send + 'static,
{
    pub fn new(
        config: &KioskConfig,
        sampler: HardwareSampler<B, C>,
        scanner: QrScanCoordinator<R>,
        hub: Arc<BroadcastHub>,
    ) -> Self {
        let (tx, rx) = unbounded_channel();
        Self {
            sampler,
            service: KioskService::new(config),
            hub,
            scanner,
            supervisor: TransactionSupervisor::new(&config.submit),
            clock: MonotonicClock::new(),
            kaspa_price: Box::new(CachedRate::new()),
            usd_to_local: Box::new(CachedRate::new()),
            poll_interval: Duration::from_millis(config.timing.poll_interval_ms),
            exchange_delay: Duration::from_secs(config.exchange.initial_delay_secs),
            exchange_interval: Duration::from_secs(config.exchange.interval_secs),
            scan_task: None,
            tx,
            rx,
        }
    }

    /// Replace the price and FX sources read on every exchange tick.
    pub fn with_rates(mut self, kaspa_price: SharedRate, usd_to_local: SharedRate) -> Self {
        self.kaspa_price = kaspa_price;
        self.usd_to_local = usd_to_local;
        self
    }

    /// Run until `shutdown` completes.
    pub async fn run(mut self, shutdown: impl Future<Output = ()>) {
        self.service.start(self.hub.as_ref());

        let mut poll = interval(self.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut exchange = interval_at(Instant::now() + self.exchange_delay, self.exchange_interval);
        exchange.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => break,
                _ = poll.tick() => {
                    let now = self.clock.now_ms();
                    for ev in self.sampler.poll(now) {
                        self.dispatch(ev.into());
                    }
                }
                Some(ev) = self.rx.recv() => self.dispatch(ev),
                _ = exchange.tick() => {
                    let ev = KioskEvent::RatesPolled {
                        kaspa_price: self.kaspa_price.get(),
                        usd_to_local: self.usd_to_local.get(),
                    };
                    self.dispatch(ev);
                }
            }
        }

        self.cancel_scan();
        info!("Kiosk stopped after {}s", self.clock.uptime_secs());
    }

    fn dispatch(&mut self, event: KioskEvent) {
        if let Some(effect) = self.service.handle(event, self.hub.as_ref()) {
            self.apply(effect);
        }
    }

    fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::StartScan { generation } => {
                self.cancel_scan();
                let scanner = self.scanner.clone();
                let tx = self.tx.clone();
                self.scan_task = Some(tokio::spawn(async move {
                    let outcome = scanner.scan().await;
                    let _ = tx.send(KioskEvent::ScanResolved { generation, outcome });
                }));
            }
            Effect::CancelScan => self.cancel_scan(),
            Effect::Submit(request) => {
                let supervisor = self.supervisor.clone();
                let hub = Arc::clone(&self.hub);
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    let outcome = supervisor.submit(&request, hub.as_ref()).await;
                    let _ = tx.send(KioskEvent::SubmissionResolved(outcome));
                });
            }
            Effect::SuppressHold => self.sampler.suppress_hold(),
        }
    }

    fn cancel_scan(&mut self) {
        if let Some(task) = self.scan_task.take() {
            if !task.is_finished() {
                debug!("Aborting running scan");
            }
            task.abort();
        }
    }
}
