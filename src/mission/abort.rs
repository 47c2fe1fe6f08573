//! Manual abort channel

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{sleep_until, Instant};

use crate::error::{NavError, Result};

/// Create a connected abort handle and signal.
pub fn abort_channel() -> (AbortHandle, AbortSignal) {
    let (tx, rx) = watch::channel(false);
    (AbortHandle { tx: Arc::new(tx) }, AbortSignal { rx })
}

/// Requests a manual abort. Cheap to clone and safe to fire more than once.
#[derive(Debug, Clone)]
pub struct AbortHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl AbortHandle {
    pub fn abort(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_aborted(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Receiving side, checked at every suspension point.
#[derive(Debug, Clone)]
pub struct AbortSignal {
    rx: watch::Receiver<bool>,
}

impl AbortSignal {
    pub fn is_aborted(&self) -> bool {
        *self.rx.borrow()
    }

    /// Fail with [`NavError::ManualAbort`] if an abort has been requested.
    pub fn check(&self) -> Result<()> {
        if self.is_aborted() {
            Err(NavError::ManualAbort)
        } else {
            Ok(())
        }
    }

    /// Sleep for `duration` unless an abort arrives first.
    ///
    /// A duration that overflows the clock fails with [`NavError::Runtime`].
    pub async fn pause(&mut self, duration: Duration) -> Result<()> {
        let deadline = Instant::now().checked_add(duration).ok_or_else(|| {
            NavError::Runtime(format!("pause of {:?} overflows the clock", duration))
        })?;
        loop {
            self.check()?;
            tokio::select! {
                _ = sleep_until(deadline) => return Ok(()),
                changed = self.rx.changed() => {
                    if changed.is_err() {
                        // Every handle is gone, nobody can abort any more
                        sleep_until(deadline).await;
                        return Ok(());
                    }
                }
            }
        }
    }
}
