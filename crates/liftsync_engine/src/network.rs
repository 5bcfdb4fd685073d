//! Connectivity signal.
//!
//! Connectivity detection belongs to the platform; this module only carries
//! its verdict to the engine. The platform glue owns a [`NetworkMonitor`] and
//! reports changes, the engine holds the matching [`NetworkSignal`].

use tokio::sync::watch;

/// Creates a connected monitor/signal pair.
pub fn channel(initially_online: bool) -> (NetworkMonitor, NetworkSignal) {
    let (sender, receiver) = watch::channel(initially_online);
    (NetworkMonitor { sender }, NetworkSignal { receiver })
}

/// Write side of the connectivity signal.
#[derive(Debug)]
pub struct NetworkMonitor {
    sender: watch::Sender<bool>,
}

impl NetworkMonitor {
    /// Reports the current connectivity. Repeating the same value is a no-op.
    pub fn set_online(&self, online: bool) {
        self.sender.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
    }

    /// Returns the last reported connectivity.
    pub fn is_online(&self) -> bool {
        *self.sender.borrow()
    }
}

/// Read side of the connectivity signal.
#[derive(Debug, Clone)]
pub struct NetworkSignal {
    receiver: watch::Receiver<bool>,
}

impl NetworkSignal {
    /// A signal that is always online. Used when no monitor is attached.
    pub fn always_online() -> Self {
        let (sender, receiver) = watch::channel(true);
        // With the sender gone the value is frozen at `true`.
        drop(sender);
        Self { receiver }
    }

    /// Returns the current connectivity.
    pub fn is_online(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Returns a stream of "became online" events.
    ///
    /// Only transitions observed after this call are reported.
    pub fn online_events(&self) -> OnlineEvents {
        let mut receiver = self.receiver.clone();
        let was_online = *receiver.borrow_and_update();
        OnlineEvents {
            receiver,
            was_online,
        }
    }
}

/// Stream of offline → online transitions.
#[derive(Debug)]
pub struct OnlineEvents {
    receiver: watch::Receiver<bool>,
    was_online: bool,
}

impl OnlineEvents {
    /// Waits for the next offline → online transition.
    ///
    /// Returns `None` once the monitor is dropped.
    pub async fn next(&mut self) -> Option<()> {
        loop {
            self.receiver.changed().await.ok()?;
            let online = *self.receiver.borrow_and_update();
            let became_online = online && !self.was_online;
            self.was_online = online;
            if became_online {
                return Some(());
            }
        }
    }
}


