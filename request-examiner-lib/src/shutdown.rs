//! Poison pill: terminate the process on request,
//! e.g. to test how clients handle an instance going away.
//!
//! The trigger itself never stops the process. It hands an
//! exit request to the [`ExitListener`], owned by whoever drives
//! the (graceful) shutdown of the process.

use rama::telemetry::tracing;
use tokio::sync::mpsc;

use crate::delay::DelaySpec;

/// Process exit code requested through the poison pill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExitCode(i32);

impl ExitCode {
    pub const SUCCESS: Self = Self(0);

    /// Parse the exit code of a poison pill request,
    /// defaulting to [`ExitCode::SUCCESS`] when absent or invalid.
    pub fn parse(raw: Option<&str>) -> Self {
        raw.and_then(|s| s.trim().parse().ok())
            .map(Self)
            .unwrap_or_default()
    }

    #[inline(always)]
    pub fn get(self) -> i32 {
        self.0
    }
}

impl From<i32> for ExitCode {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

/// Create a connected [`ExitHandle`] and [`ExitListener`] pair.
pub fn exit_channel() -> (ExitHandle, ExitListener) {
    let (tx, rx) = mpsc::channel(1);
    (ExitHandle { tx }, ExitListener { rx })
}

/// Used to request the process to exit, created using [`exit_channel`].
#[derive(Debug, Clone)]
pub struct ExitHandle {
    tx: mpsc::Sender<ExitCode>,
}

impl ExitHandle {
    /// Request the process to exit with the given code.
    ///
    /// Returns false if an exit was already requested
    /// or nobody is listening anymore.
    pub fn request_exit(&self, code: ExitCode) -> bool {
        match self.tx.try_send(code) {
            Ok(()) => true,
            Err(err) => {
                tracing::debug!("drop exit request with code {}: {err}", code.get());
                false
            }
        }
    }
}

/// Receives the exit requests of its [`ExitHandle`]s.
#[derive(Debug)]
pub struct ExitListener {
    rx: mpsc::Receiver<ExitCode>,
}

impl ExitListener {
    /// Wait for the first exit request.
    ///
    /// Returns `None` once all handles are dropped without a request.
    pub async fn recv(&mut self) -> Option<ExitCode> {
        self.rx.recv().await
    }
}

/// Wait for the (optional) delay, then request the process to exit.
///
/// Returns the requested exit code immediately after
/// the request was handed off.
pub async fn trigger(delay: &DelaySpec, exit: Option<&str>, handle: &ExitHandle) -> ExitCode {
    if let Some(duration) = delay.resolve() {
        tracing::info!("poison pill: wait {duration:?} before requesting exit");
        tokio::time::sleep(duration).await;
    }

    let code = ExitCode::parse(exit);
    if handle.request_exit(code) {
        tracing::info!("poison pill: exit requested with code {}", code.get());
    } else {
        tracing::warn!(
            "poison pill: exit request with code {} ignored: already requested",
            code.get()
        );
    }
    code
}
