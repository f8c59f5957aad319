//! Application foreground state.
//!
//! The host publishes transitions through [`ForegroundMonitor`]. Consumers
//! either hold a [`ForegroundSignal`] (last value + async wait) or register a
//! synchronous [`ForegroundListener`].
//!
//! A signal whose monitor has been dropped reports "background" forever, so
//! anything gated on it fails closed.

use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tokio::sync::watch;

/// Synchronous observer of foreground transitions.
pub trait ForegroundListener: Send + Sync {
    fn on_foreground_changed(&self, is_foreground: bool);
}

/// Publisher of the foreground state.
pub struct ForegroundMonitor {
    tx: watch::Sender<bool>,
    listeners: Mutex<Vec<Weak<dyn ForegroundListener>>>,
    /// Held across publish and delivery so listeners see transitions in order.
    delivery: Mutex<()>,
}

impl std::fmt::Debug for ForegroundMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForegroundMonitor")
            .field("is_foreground", &*self.tx.borrow())
            .field("listeners", &self.listeners.lock().len())
            .finish()
    }
}

impl ForegroundMonitor {
    pub fn new(is_foreground: bool) -> Arc<Self> {
        let (tx, _) = watch::channel(is_foreground);
        Arc::new(Self { tx, listeners: Mutex::new(Vec::new()), delivery: Mutex::new(()) })
    }

    pub fn is_foreground(&self) -> bool {
        *self.tx.borrow()
    }

    /// Publish a new state. Repeated values are ignored.
    ///
    /// Listeners must not call back into `set_foreground`.
    pub fn set_foreground(&self, is_foreground: bool) {
        let _delivery = self.delivery.lock();
        let previous = self.tx.send_replace(is_foreground);
        if previous == is_foreground {
            return;
        }

        tracing::debug!(is_foreground, "Foreground state changed");

        // Call out without holding the listener list so listeners may re-register.
        let listeners: Vec<Arc<dyn ForegroundListener>> = {
            let mut guard = self.listeners.lock();
            guard.retain(|l| l.strong_count() > 0);
            guard.iter().filter_map(Weak::upgrade).collect()
        };
        for listener in listeners {
            listener.on_foreground_changed(is_foreground);
        }
    }

    pub fn add_listener(&self, listener: Weak<dyn ForegroundListener>) {
        self.listeners.lock().push(listener);
    }

    pub fn signal(&self) -> ForegroundSignal {
        ForegroundSignal { rx: self.tx.subscribe() }
    }
}

/// Read side of the foreground state.
#[derive(Debug, Clone)]
pub struct ForegroundSignal {
    rx: watch::Receiver<bool>,
}

impl ForegroundSignal {
    pub fn is_foreground(&self) -> bool {
        if self.rx.has_changed().is_err() {
            return false;
        }
        *self.rx.borrow()
    }

    /// Resolves once the app is in the foreground. Returns `false` when the
    /// monitor is gone, in which case the app is never considered foregrounded.
    pub async fn wait_for_foreground(&self) -> bool {
        if self.rx.has_changed().is_err() {
            return false;
        }
        let mut rx = self.rx.clone();
        let result = rx.wait_for(|is_foreground| *is_foreground).await.is_ok();
        result
    }

    /// Resolves on the next published value; `false` when the monitor is gone.
    pub async fn changed(&self) -> bool {
        let mut rx = self.rx.clone();
        rx.changed().await.is_ok()
    }
}
