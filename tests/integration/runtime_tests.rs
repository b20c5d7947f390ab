//! End-to-end run of the kiosk event loop on real time.
//!
//! Mock lines and a mock code reader stand in for the hardware; the
//! submission program is a shell snippet.  The test acts as a display
//! client on the hub and walks one customer through the whole cycle.

use std::sync::Arc;
use std::time::Duration;

use changeomatic::adapters::rates::CachedRate;
use changeomatic::config::KioskConfig;
use changeomatic::drivers::sampler::HardwareSampler;
use changeomatic::hub::BroadcastHub;
use changeomatic::runtime::KioskRuntime;
use changeomatic::scan::QrScanCoordinator;
use serde_json::Value;
use tokio::sync::mpsc::Receiver;
use tokio::sync::oneshot;
use tokio::time::{sleep, timeout};

use crate::mock_hw::{MockCodeReader, MockLine};

fn test_config() -> KioskConfig {
    let mut config = KioskConfig::default();
    config.timing.debounce_ms = 20;
    config.timing.signal_min_ms = 10;
    config.timing.signal_max_ms = 60;
    config.scan.timeout_secs = 5;
    config.scan.retry_interval_ms = 10;
    config.exchange.initial_delay_secs = 0;
    config.submit.program = "sh".into();
    config.submit.args = vec![
        "-c".into(),
        r#"printf '{"type":"info","message":"%s"}\n' "$*"; printf '{"type":"success","message":"sent"}\n'"#
            .into(),
        "sh".into(),
    ];
    config.submit.timeout_secs = 10;
    config.validate().unwrap();
    config
}

async fn press(button: &MockLine) {
    button.set(true);
    sleep(Duration::from_millis(80)).await;
    button.set(false);
    sleep(Duration::from_millis(60)).await;
}

/// Read messages until one named `event` arrives.
async fn collect_until(rx: &mut Receiver<String>, seen: &mut Vec<Value>, event: &str) {
    let wait = async {
        while let Some(msg) = rx.recv().await {
            let value: Value = serde_json::from_str(&msg).unwrap();
            let done = value["event"] == event;
            seen.push(value);
            if done {
                return;
            }
        }
        panic!("hub closed before {event}");
    };
    timeout(Duration::from_secs(10), wait)
        .await
        .unwrap_or_else(|_| panic!("no {event} within 10s"));
}

fn screens(seen: &[Value]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for v in seen.iter().filter(|v| v["event"] == "screen-change") {
        let name = v["data"]["screen"].as_str().unwrap().to_string();
        if out.last() != Some(&name) {
            out.push(name);
        }
    }
    out
}

#[tokio::test]
async fn customer_cycle_end_to_end() {
    let config = test_config();
    let button = MockLine::new(false);
    let coin = MockLine::new(true);
    let reader = MockCodeReader::new();
    let hub = Arc::new(BroadcastHub::new());

    let sampler = HardwareSampler::new(button.clone(), coin.clone(), &config.timing);
    let scanner = QrScanCoordinator::new(reader.clone(), &config.scan);
    let runtime = KioskRuntime::new(&config, sampler, scanner, Arc::clone(&hub)).with_rates(
        Box::new(CachedRate::with_value(0.1)),
        Box::new(CachedRate::with_value(1.5)),
    );

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let customer = async {
        let (_, mut rx) = hub.register();
        let mut seen = Vec::new();

        collect_until(&mut rx, &mut seen, "exchange-update").await;
        press(&button).await;
        press(&button).await;

        coin.set(false);
        sleep(Duration::from_millis(30)).await;
        coin.set(true);
        collect_until(&mut rx, &mut seen, "coin-update").await;

        reader.show("kaspa:qruntime");
        press(&button).await;
        press(&button).await;
        collect_until(&mut rx, &mut seen, "submit-outcome").await;

        let _ = stop_tx.send(());
        seen
    };

    let ((), seen) = tokio::join!(
        runtime.run(async {
            let _ = stop_rx.await;
        }),
        customer
    );

    assert_eq!(
        screens(&seen),
        [
            "welcome",
            "wallet",
            "insert-coin",
            "confirm-amount",
            "scan-wallet",
            "processing",
        ]
    );

    let exchange = seen.iter().find(|v| v["event"] == "exchange-update").unwrap();
    assert_eq!(exchange["data"]["kaspa_price"], 0.1);
    assert_eq!(exchange["data"]["usd_to_aud"], 1.5);

    let logs: Vec<&Value> = seen.iter().filter(|v| v["event"] == "submit-log").collect();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0]["data"]["type"], "INFO");
    let args = logs[0]["data"]["message"].as_str().unwrap();
    assert!(args.contains("--address kaspa:qruntime"), "{args}");
    assert!(args.contains("--amount 6.66666667"), "{args}");
    assert_eq!(logs[1]["data"]["type"], "SUCCESS");

    assert_eq!(seen.last().unwrap()["data"]["result"], true);
}
