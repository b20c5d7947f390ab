//! Transaction submission supervisor.
//!
//! Launches the external submission program, relays its JSON progress lines
//! to the display as `submit-log` events and settles on exactly one
//! `submit-outcome`.
//!
//! ## Progress protocol
//!
//! The program prints one JSON object per stdout line:
//!
//! ```text
//! {"type": "info",    "message": "Building transaction"}
//! {"type": "success", "message": "Sent 0.12 KAS"}
//! ```
//!
//! `success` and `error` are terminal.  Anything else is relayed and the
//! run continues.  EOF without a terminal line, a spawn failure and the
//! time budget running out all count as failure.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use log::{debug, error, info, warn};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};

use crate::app::events::DisplayEvent;
use crate::app::ports::EventSink;
use crate::config::SubmitConfig;
use crate::error::SubmitError;

/// What to send and where.  `amount` is already formatted in KAS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitRequest {
    pub amount: String,
    pub address: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Success,
    Failure,
}

impl SubmitOutcome {
    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

/// One decoded stdout line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressLine {
    /// Lower-case as emitted by the program; defaults to `info`.
    pub kind: String,
    pub message: String,
}

impl ProgressLine {
    fn terminal(&self) -> Option<SubmitOutcome> {
        match self.kind.as_str() {
            "success" => Some(SubmitOutcome::Success),
            "error" => Some(SubmitOutcome::Failure),
            _ => None,
        }
    }
}

/// Decode a progress line.  `None` for anything that is not a JSON object.
pub fn parse_progress(line: &str) -> Option<ProgressLine> {
    let value: Value = serde_json::from_str(line).ok()?;
    let obj = value.as_object()?;

    let kind = match obj.get("type") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => "info".to_string(),
        Some(other) => other.to_string(),
    };
    let message = match obj.get("message") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    };
    Some(ProgressLine { kind, message })
}

#[derive(Debug, Clone)]
pub struct TransactionSupervisor {
    program: PathBuf,
    args: Vec<String>,
    encoding: String,
    network: String,
    timeout: Duration,
}

impl TransactionSupervisor {
    pub fn new(config: &SubmitConfig) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
            encoding: config.encoding.clone(),
            network: config.network.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// Full argument list for one run, after the program itself.
    pub fn command_args(&self, req: &SubmitRequest) -> Vec<String> {
        let mut args = self.args.clone();
        args.extend([
            "--encoding".to_string(),
            self.encoding.clone(),
            "--network".to_string(),
            self.network.clone(),
            "--address".to_string(),
            req.address.clone(),
            "--amount".to_string(),
            req.amount.clone(),
        ]);
        args
    }

    /// Run the program to completion.  Emits exactly one
    /// [`DisplayEvent::SubmitOutcome`] whatever happens.
    pub async fn submit(&self, req: &SubmitRequest, sink: &impl EventSink) -> SubmitOutcome {
        info!("Submitting {} KAS to {}", req.amount, req.address);

        let outcome = match self.run(req, sink).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Submission failed: {e}");
                SubmitOutcome::Failure
            }
        };

        info!("Submission outcome: {:?}", outcome);
        sink.emit(&DisplayEvent::SubmitOutcome {
            result: outcome.is_success(),
        });
        outcome
    }

    async fn run(&self, req: &SubmitRequest, sink: &impl EventSink) -> Result<SubmitOutcome, SubmitError> {
        let mut child = Command::new(&self.program)
            .args(self.command_args(req))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(SubmitError::Spawn)?;

        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(drain_lines(stderr, "submit stderr"));
        }
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SubmitError::Io(std::io::Error::other("stdout not captured")))?;

        match tokio::time::timeout(self.timeout, follow_progress(stdout, sink)).await {
            Ok(result) => {
                reap(child);
                result
            }
            Err(_) => {
                warn!("Submission exceeded {:?}, killing it", self.timeout);
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill submission program: {e}");
                }
                Err(SubmitError::TimedOut)
            }
        }
    }
}

/// Relay stdout lines until a terminal one.
async fn follow_progress<R>(stdout: R, sink: &impl EventSink) -> Result<SubmitOutcome, SubmitError>
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(stdout).lines();
    while let Some(line) = lines.next_line().await.map_err(SubmitError::Io)? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some(progress) = parse_progress(line) else {
            info!("[UNKNOWN] {line}");
            continue;
        };

        let kind = progress.kind.to_uppercase();
        info!("[{kind}] {}", progress.message);
        sink.emit(&DisplayEvent::SubmitLog {
            kind,
            message: progress.message.clone(),
        });

        if let Some(outcome) = progress.terminal() {
            return Ok(outcome);
        }
    }
    Err(SubmitError::NoTerminalMarker)
}

/// The program may keep running briefly after its terminal line.
fn reap(mut child: Child) {
    tokio::spawn(async move {
        match child.wait().await {
            Ok(status) => debug!("Submission program exited: {status}"),
            Err(e) => warn!("Waiting for submission program: {e}"),
        }
    });
}

async fn drain_lines<R>(stream: R, label: &'static str)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(stream).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => debug!("[{label}] {}", line.trim_end()),
            Ok(None) => break,
            Err(e) => {
                debug!("[{label}] read failed: {e}");
                break;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Resubmission monitor
// ---------------------------------------------------------------------------

/// Long-running helper that retries pending transactions.  Its output is
/// only logged.
#[derive(Debug, Clone)]
pub struct MonitorSupervisor {
    program: PathBuf,
    script: PathBuf,
    encoding: String,
    network: String,
}

impl MonitorSupervisor {
    /// `None` when no monitor script is configured.
    pub fn new(config: &SubmitConfig) -> Option<Self> {
        let script = config.monitor_script.clone()?;
        Some(Self {
            program: config.program.clone(),
            script,
            encoding: config.encoding.clone(),
            network: config.network.clone(),
        })
    }

    /// Run until the monitor exits.
    pub async fn run(&self) -> Result<(), SubmitError> {
        info!("Starting transaction monitor {}", self.script.display());
        let mut child = Command::new(&self.program)
            .arg(&self.script)
            .args(["--encoding", self.encoding.as_str(), "--network", self.network.as_str()])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(SubmitError::Spawn)?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        tokio::join!(
            async {
                if let Some(s) = stdout {
                    monitor_lines(s).await;
                }
            },
            async {
                if let Some(s) = stderr {
                    monitor_lines(s).await;
                }
            },
        );

        let status = child.wait().await.map_err(SubmitError::Io)?;
        info!("Transaction monitor exited: {status}");
        Ok(())
    }
}

async fn monitor_lines<R: AsyncRead + Unpin>(stream: R) {
    let mut lines = BufReader::new(stream).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        info!("[MONITOR] {}", line.trim());
    }
}
