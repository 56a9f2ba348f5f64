//! Cooperative shutdown signal.

use tokio::sync::watch;

/// Fires the shutdown signal.
#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

impl ShutdownTrigger {
    pub fn fire(&self) {
        // receivers may all be gone already
        let _ = self.tx.send(true);
    }
}

/// Observes the shutdown signal. Clones observe the same signal.
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once shutdown was requested, or the trigger was dropped.
    pub async fn cancelled(&mut self) {
        while !*self.rx.borrow_and_update() {
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }
}

pub fn channel() -> (ShutdownTrigger, Shutdown) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx }, Shutdown { rx })
}

/// Fires `trigger` on Ctrl-C.
pub fn trigger_on_ctrl_c(trigger: ShutdownTrigger) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                log::info!("[Shutdown] interrupt received, draining queue");
                trigger.fire();
            }
            Err(e) => {
                log::error!("[Shutdown] cannot listen for interrupt: {}", e);
                // dropping the trigger would also end the engine
                std::future::pending::<()>().await;
            }
        }
    })
}
