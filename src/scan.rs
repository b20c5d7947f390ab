//! QR scan coordinator.
//!
//! Polls the code reader with a length-prefixed protocol until it yields a
//! payload or the deadline passes:
//!
//! 1. read 2 bytes, little-endian payload length
//! 2. length 0 or above the limit: nothing this attempt
//! 3. otherwise re-read header + payload and decode the payload as UTF-8,
//!    dropping invalid bytes
//!
//! Bus reads are blocking, so each attempt runs on the blocking pool; the
//! pause between attempts is an async sleep, leaving the event loop free.
//! Cancellation is by aborting the task that awaits [`scan`](QrScanCoordinator::scan).

use std::sync::{Arc, Mutex};
use std::time::Duration;

use heapless::Vec;
use log::{debug, info};
use tokio::time::{Instant, sleep};

use crate::app::ports::CodeReader;
use crate::config::ScanConfig;
use crate::error::ScanError;

/// Protocol ceiling on the payload length.
pub const MAX_PAYLOAD_LEN: u16 = 254;

/// Header plus the largest payload.
const FRAME_CAPACITY: usize = MAX_PAYLOAD_LEN as usize + 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    Payload(String),
    TimedOut,
}

pub struct QrScanCoordinator<R> {
    reader: Arc<Mutex<R>>,
    timeout: Duration,
    retry_interval: Duration,
    max_len: u16,
}

impl<R> Clone for QrScanCoordinator<R> {
    fn clone(&self) -> Self {
        Self {
            reader: Arc::clone(&self.reader),
            timeout: self.timeout,
            retry_interval: self.retry_interval,
            max_len: self.max_len,
        }
    }
}

impl<R: CodeReader + Send + 'static> QrScanCoordinator<R> {
    pub fn new(reader: R, config: &ScanConfig) -> Self {
        Self::with_timing(
            reader,
            Duration::from_secs(config.timeout_secs),
            Duration::from_millis(config.retry_interval_ms),
            config.max_payload_len,
        )
    }

    pub fn with_timing(reader: R, timeout: Duration, retry_interval: Duration, max_len: u16) -> Self {
        Self {
            reader: Arc::new(Mutex::new(reader)),
            timeout,
            retry_interval,
            max_len: max_len.min(MAX_PAYLOAD_LEN),
        }
    }

    /// Keep reading until a payload arrives or the timeout elapses.
    pub async fn scan(&self) -> ScanOutcome {
        let deadline = Instant::now() + self.timeout;
        info!("Scanning for QR code ({:?} timeout)", self.timeout);

        loop {
            match self.attempt().await {
                Ok(payload) => {
                    info!("Found QR code ({} chars)", payload.len());
                    return ScanOutcome::Payload(payload);
                }
                Err(ScanError::Empty) => {}
                Err(e) => debug!("Scan attempt: {e}"),
            }
            if Instant::now() >= deadline {
                break;
            }
            sleep(self.retry_interval).await;
        }

        info!("QR code timeout reached");
        ScanOutcome::TimedOut
    }

    async fn attempt(&self) -> Result<String, ScanError> {
        let reader = Arc::clone(&self.reader);
        let max_len = self.max_len;
        tokio::task::spawn_blocking(move || {
            let mut reader = reader.lock().map_err(|_| ScanError::Interrupted)?;
            read_frame(&mut *reader, max_len)
        })
        .await
        .map_err(|_| ScanError::Interrupted)?
    }
}

/// One length-prefixed read from the code reader.
pub fn read_frame<R: CodeReader + ?Sized>(reader: &mut R, max_len: u16) -> Result<String, ScanError> {
    let mut header = [0u8; 2];
    reader.read(&mut header)?;
    let len = u16::from_le_bytes(header);
    if len == 0 {
        return Err(ScanError::Empty);
    }
    if len > max_len {
        return Err(ScanError::Oversized(len));
    }

    let mut frame: Vec<u8, FRAME_CAPACITY> = Vec::new();
    frame
        .resize_default(len as usize + 2)
        .map_err(|()| ScanError::Oversized(len))?;
    reader.read(&mut frame)?;
    Ok(decode_payload(&frame[2..]))
}

/// UTF-8 decode that drops invalid sequences instead of failing.
fn decode_payload(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        out.push_str(chunk.valid());
    }
    out
}
