//! Pipeline-wide cancellation
//!
//! Every job holds a clone of the same [`CancelSignal`]. Once fired it stays
//! fired; jobs observe it between stages and while waiting on subprocesses.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct CancelSignal {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    /// Fires the signal for every clone
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the signal has fired
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|fired| *fired).await.is_err() {
            // sender lives as long as self, so this never resolves
            std::future::pending::<()>().await;
        }
    }

    /// Fires the signal when the process receives Ctrl-C
    pub fn cancel_on_ctrl_c(&self) -> tokio::task::JoinHandle<()> {
        let signal = self.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, cancelling in-flight jobs");
                signal.cancel();
            }
        })
    }

    /// Fires the signal after `timeout` elapses
    pub fn cancel_after(&self, timeout: Duration) -> tokio::task::JoinHandle<()> {
        let signal = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            warn!("Pipeline timeout of {:?} reached, cancelling in-flight jobs", timeout);
            signal.cancel();
        })
    }
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::new()
    }
}
