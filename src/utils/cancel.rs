//! Cooperative cancellation
//!
//! A caller creates a handle/signal pair, hands the signal to long-running
//! operations and trips the handle (for example on Ctrl-C). Operations race
//! their futures against the signal and return `Cancelled` when it fires.

use crate::error::{Result, RgDeployError};
use std::future::Future;
use tokio::sync::watch;

/// Owning side of a cancellation pair
#[derive(Debug)]
pub struct CancellationHandle {
    tx: watch::Sender<bool>,
}

impl CancellationHandle {
    /// Request cancellation of every operation holding the paired signal
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

/// Observing side of a cancellation pair, cheap to clone
#[derive(Debug, Clone)]
pub struct CancellationSignal {
    rx: watch::Receiver<bool>,
}

/// Create a connected handle and signal
pub fn cancellation_pair() -> (CancellationHandle, CancellationSignal) {
    let (tx, rx) = watch::channel(false);
    (CancellationHandle { tx }, CancellationSignal { rx })
}

impl CancellationSignal {
    /// A signal that never fires
    pub fn never() -> Self {
        let (_, signal) = cancellation_pair();
        signal
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancellation has been requested
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                // Handle dropped without cancelling
                std::future::pending::<()>().await;
            }
        }
    }

    /// Run `future` unless cancellation is requested first
    pub async fn run<F, T>(&self, future: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if self.is_cancelled() {
            return Err(RgDeployError::Cancelled);
        }

        tokio::select! {
            biased;
            _ = self.cancelled() => Err(RgDeployError::Cancelled),
            result = future => result,
        }
    }
}

impl Default for CancellationSignal {
    fn default() -> Self {
        Self::never()
    }
}
