//! Process-wide cooperative shutdown.
//!
//! A single one-way flag shared by every task. Once requested it never
//! resets; long sleeps observe it promptly through [`Shutdown::sleep`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{error, info};

/// Clonable handle to the shutdown flag.
#[derive(Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<bool>>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Flip the flag. Idempotent; there is no way to unset it.
    pub fn request(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_shutdown(&self) -> bool {
        *self.tx.borrow()
    }

    /// A receiver tracking the flag, for select loops that need one.
    pub fn watch(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    /// Resolves once shutdown has been requested.
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        while !*rx.borrow() {
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Sleep for `duration` unless shutdown arrives first. Returns `true`
    /// when the full duration elapsed, `false` when interrupted.
    pub async fn sleep(&self, duration: Duration) -> bool {
        if self.is_shutdown() {
            return false;
        }
        tokio::select! {
            () = self.wait() => false,
            () = tokio::time::sleep(duration) => true,
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Spawn a task that requests shutdown on SIGINT or SIGTERM.
pub fn install_signal_handlers(shutdown: &Shutdown) {
    let shutdown = shutdown.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        shutdown.request();
    });
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = match signal(SignalKind::interrupt()) {
        Ok(stream) => stream,
        Err(error) => {
            error!(%error, "failed to install SIGINT handler");
            return;
        }
    };
    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(error) => {
            error!(%error, "failed to install SIGTERM handler");
            return;
        }
    };

    tokio::select! {
        _ = interrupt.recv() => info!("received SIGINT, shutting down"),
        _ = terminate.recv() => info!("received SIGTERM, shutting down"),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        error!(%error, "failed to wait for interrupt");
        return;
    }
    info!("received interrupt, shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn request_is_one_way() {
        let shutdown = Shutdown::new();
        assert!(!shutdown.is_shutdown());

        shutdown.request();
        shutdown.request();
        assert!(shutdown.is_shutdown());
    }

    #[tokio::test]
    async fn wait_resolves_after_request() {
        let shutdown = Shutdown::new();
        let waiter = {
            let shutdown = shutdown.clone();
            tokio::spawn(async move { shutdown.wait().await })
        };

        shutdown.request();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("wait did not resolve")
            .expect("waiter panicked");
    }

    #[tokio::test]
    async fn sleep_completes_when_undisturbed() {
        let shutdown = Shutdown::new();
        assert!(shutdown.sleep(Duration::from_millis(1)).await);
    }

    #[tokio::test]
    async fn sleep_is_cut_short_by_shutdown() {
        let shutdown = Shutdown::new();
        let sleeper = {
            let shutdown = shutdown.clone();
            tokio::spawn(async move { shutdown.sleep(Duration::from_secs(60)).await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        shutdown.request();

        let completed = tokio::time::timeout(Duration::from_secs(1), sleeper)
            .await
            .expect("sleep did not observe shutdown")
            .expect("sleeper panicked");
        assert!(!completed);
    }

    #[test]
    fn sleep_after_shutdown_returns_immediately() {
        tokio_test::block_on(async {
            let shutdown = Shutdown::new();
            shutdown.request();
            assert!(!shutdown.sleep(Duration::from_secs(60)).await);
        });
    }
}
