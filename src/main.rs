//! Change-o-matic: main entry point
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  LinuxHardware      BroadcastHub + axum   CachedRate ◀ fetcher │
//! │  (pins, I2C)        (EventSink)           (RateSource)         │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              KioskService (pure logic)                 │    │
//! │  │  Screen FSM · deferred credits · staleness             │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  KioskRuntime: poll tick · scan task · submission task         │
//! └────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use anyhow::{Context, Result};
use env_logger::{Builder, Env};
use log::{error, info, warn};

use changeomatic::adapters::fetcher::spawn_feed;
use changeomatic::adapters::linux::LinuxHardware;
use changeomatic::adapters::rates::CachedRate;
use changeomatic::config::KioskConfig;
use changeomatic::drivers::sampler::HardwareSampler;
use changeomatic::hub::BroadcastHub;
use changeomatic::runtime::KioskRuntime;
use changeomatic::scan::QrScanCoordinator;
use changeomatic::server;
use changeomatic::submit::MonitorSupervisor;

#[tokio::main]
async fn main() -> Result<()> {
    Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    info!("Change-o-matic v{} starting", env!("CARGO_PKG_VERSION"));

    let config = KioskConfig::load_from_env().context("loading configuration")?;
    let hw = LinuxHardware::open(&config.hardware).context("opening kiosk hardware")?;

    let hub = Arc::new(BroadcastHub::new());
    let listener = tokio::net::TcpListener::bind(config.server.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.server.listen_addr))?;
    let server_hub = Arc::clone(&hub);
    tokio::spawn(async move {
        if let Err(e) = server::serve_on(listener, server_hub).await {
            error!("WebSocket server stopped: {e}");
        }
    });

    if let Some(monitor) = MonitorSupervisor::new(&config.submit) {
        tokio::spawn(async move {
            if let Err(e) = monitor.run().await {
                warn!("Transaction monitor: {e}");
            }
        });
    }

    let kaspa_price = CachedRate::new();
    let usd_to_local = CachedRate::new();
    spawn_feed("Kaspa price", config.exchange.kaspa_price_feed.as_ref(), &kaspa_price)
        .context("starting Kaspa price feed")?;
    spawn_feed("FX rate", config.exchange.usd_to_local_feed.as_ref(), &usd_to_local)
        .context("starting FX rate feed")?;

    let sampler = HardwareSampler::new(hw.button, hw.coin, &config.timing);
    let scanner = QrScanCoordinator::new(hw.code_reader, &config.scan);
    KioskRuntime::new(&config, sampler, scanner, hub)
        .with_rates(Box::new(kaspa_price), Box::new(usd_to_local))
        .run(shutdown_signal())
        .await;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Ctrl-C handler unavailable: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("SIGTERM handler unavailable: {e}");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Ctrl-C received"),
        () = terminate => info!("SIGTERM received"),
    }
}
