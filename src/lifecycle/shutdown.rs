//! Shutdown coordination for the server.

use tokio::sync::watch;

/// Latched shutdown flag shared by the server and test harnesses.
///
/// Once triggered it stays triggered, so a signal taken after the trigger
/// still fires. Detached report tasks never hold a signal and are abandoned.
pub struct Shutdown {
    tx: watch::Sender<bool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }

    /// Latch the flag. Safe to call repeatedly or with no signal alive.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving side of [`Shutdown`].
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Resolve once shutdown is triggered. Never resolves if the
    /// coordinator is dropped untriggered.
    pub async fn recv(&mut self) {
        let triggered = self.rx.wait_for(|triggered| *triggered).await.is_ok();
        if !triggered {
            std::future::pending::<()>().await;
        }
    }
}
