//! Observable per-channel connection state.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::{Mutex, MutexGuard, PoisonError};

use aidalink_frame::ChannelId;
use serde::Serialize;
use tracing::{debug, warn};

/// Lifecycle of one channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting {
        host: String,
        port: u16,
    },
    Connected {
        host: String,
        port: u16,
    },
    /// An established connection broke. `cause` is the rendered error.
    Failed {
        host: String,
        port: u16,
        cause: String,
    },
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected { .. })
    }

    /// Short lowercase label.
    pub fn label(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting { .. } => "connecting",
            ConnectionState::Connected { .. } => "connected",
            ConnectionState::Failed { .. } => "failed",
        }
    }

    /// State after an operation on this channel failed.
    ///
    /// A connect that never completed falls back to `Disconnected`; an
    /// established connection becomes `Failed`. Any other state is kept.
    pub fn after_error(&self, cause: &dyn fmt::Display) -> Option<ConnectionState> {
        match self {
            ConnectionState::Connecting { .. } => Some(ConnectionState::Disconnected),
            ConnectionState::Connected { host, port } => Some(ConnectionState::Failed {
                host: host.clone(),
                port: *port,
                cause: cause.to_string(),
            }),
            ConnectionState::Disconnected | ConnectionState::Failed { .. } => None,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => f.write_str("disconnected"),
            ConnectionState::Connecting { host, port } => write!(f, "connecting to {host}:{port}"),
            ConnectionState::Connected { host, port } => write!(f, "connected to {host}:{port}"),
            ConnectionState::Failed { host, port, cause } => {
                write!(f, "failed ({host}:{port}): {cause}")
            }
        }
    }
}

/// One state write, as seen by subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateChange {
    pub channel: ChannelId,
    pub previous: ConnectionState,
    pub current: ConnectionState,
}

/// Changes queued per subscriber before further changes are dropped for it.
pub const SUBSCRIBER_CAPACITY: usize = 256;

struct Inner {
    states: BTreeMap<ChannelId, ConnectionState>,
    subscribers: Vec<SyncSender<StateChange>>,
}

/// Lock-guarded map holding exactly one state per [`ChannelId`].
///
/// Every write is a single read-modify-write under the lock and is pushed to
/// all live subscribers before the lock is released, so subscribers observe
/// writes in order.
pub struct StateRegistry {
    inner: Mutex<Inner>,
}

impl Default for StateRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl StateRegistry {
    /// Every channel starts `Disconnected`.
    pub fn new() -> Self {
        let states = ChannelId::ALL
            .iter()
            .map(|id| (*id, ConnectionState::Disconnected))
            .collect();
        Self {
            inner: Mutex::new(Inner {
                states,
                subscribers: Vec::new(),
            }),
        }
    }

    pub fn get(&self, channel: ChannelId) -> ConnectionState {
        self.lock()
            .states
            .get(&channel)
            .cloned()
            .unwrap_or_default()
    }

    /// Point-in-time copy of every channel's state, in channel order.
    pub fn snapshot(&self) -> Vec<(ChannelId, ConnectionState)> {
        self.lock()
            .states
            .iter()
            .map(|(id, state)| (*id, state.clone()))
            .collect()
    }

    pub fn is_any_connected(&self) -> bool {
        self.lock().states.values().any(ConnectionState::is_connected)
    }

    /// Receive every subsequent state write.
    ///
    /// Each subscriber has a queue of [`SUBSCRIBER_CAPACITY`] changes. A
    /// subscriber that stops draining loses the changes that do not fit;
    /// writers never block on it. [`StateRegistry::get`] always has the
    /// latest state. Dropping the receiver unsubscribes on the next write.
    pub fn subscribe(&self) -> Receiver<StateChange> {
        let (tx, rx) = mpsc::sync_channel(SUBSCRIBER_CAPACITY);
        self.lock().subscribers.push(tx);
        rx
    }

    /// Unconditionally write a state.
    pub(crate) fn set(&self, channel: ChannelId, state: ConnectionState) {
        self.update(channel, |_| Some(state));
    }

    /// Compute the next state from the current one under the lock.
    /// Returning `None` leaves the state untouched and notifies nobody.
    pub(crate) fn update<F>(&self, channel: ChannelId, next: F) -> Option<ConnectionState>
    where
        F: FnOnce(&ConnectionState) -> Option<ConnectionState>,
    {
        let mut inner = self.lock();
        let previous = inner.states.get(&channel).cloned().unwrap_or_default();
        let current = next(&previous)?;
        inner.states.insert(channel, current.clone());
        debug!(
            channel = channel.name(),
            from = previous.label(),
            to = current.label(),
            "state changed"
        );

        let change = StateChange {
            channel,
            previous,
            current: current.clone(),
        };
        inner
            .subscribers
            .retain(|subscriber| match subscriber.try_send(change.clone()) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    warn!(channel = channel.name(), "state subscriber full, change dropped");
                    true
                }
                Err(TrySendError::Disconnected(_)) => false,
            });
        Some(current)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for StateRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.snapshot()).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    fn connected() -> ConnectionState {
        ConnectionState::Connected {
            host: "10.0.0.2".to_string(),
            port: 6662,
        }
    }

    #[test]
    fn starts_with_every_channel_disconnected() {
        let registry = StateRegistry::new();
        let snapshot = registry.snapshot();
        assert_eq!(snapshot.len(), ChannelId::ALL.len());
        assert!(snapshot
            .iter()
            .all(|(_, state)| *state == ConnectionState::Disconnected));
        assert!(!registry.is_any_connected());
    }

    #[test]
    fn error_rule() {
        let connecting = ConnectionState::Connecting {
            host: "h".to_string(),
            port: 1,
        };
        assert_eq!(
            connecting.after_error(&"refused"),
            Some(ConnectionState::Disconnected)
        );

        let failed = connected().after_error(&"reset").expect("connected should fail");
        assert_eq!(
            failed,
            ConnectionState::Failed {
                host: "10.0.0.2".to_string(),
                port: 6662,
                cause: "reset".to_string(),
            }
        );

        assert_eq!(ConnectionState::Disconnected.after_error(&"x"), None);
        assert_eq!(failed.after_error(&"again"), None);
    }

    #[test]
    fn subscribers_see_writes_in_order() {
        let registry = StateRegistry::new();
        let rx = registry.subscribe();

        registry.set(
            ChannelId::Video,
            ConnectionState::Connecting {
                host: "10.0.0.2".to_string(),
                port: 6662,
            },
        );
        registry.set(ChannelId::Video, connected());

        let first = rx.try_recv().expect("first change");
        assert_eq!(first.channel, ChannelId::Video);
        assert_eq!(first.previous, ConnectionState::Disconnected);
        assert_eq!(first.current.label(), "connecting");

        let second = rx.try_recv().expect("second change");
        assert_eq!(second.previous.label(), "connecting");
        assert_eq!(second.current, connected());
        assert!(registry.is_any_connected());
    }

    #[test]
    fn no_op_update_notifies_nobody() {
        let registry = StateRegistry::new();
        let rx = registry.subscribe();
        assert_eq!(registry.update(ChannelId::Lidar, |_| None), None);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let registry = StateRegistry::new();
        drop(registry.subscribe());
        let live = registry.subscribe();
        registry.set(ChannelId::Stt, connected());
        assert_eq!(registry.lock().subscribers.len(), 1);
        assert!(live.try_recv().is_ok());
    }

    #[test]
    fn undrained_subscriber_is_bounded() {
        let registry = StateRegistry::new();
        let stalled = registry.subscribe();
        for _ in 0..SUBSCRIBER_CAPACITY {
            registry.set(ChannelId::Joystick, connected());
            registry.set(ChannelId::Joystick, ConnectionState::Disconnected);
        }
        registry.set(ChannelId::Joystick, connected());

        assert_eq!(stalled.try_iter().count(), SUBSCRIBER_CAPACITY);
        assert_eq!(registry.lock().subscribers.len(), 1);
        assert!(registry.get(ChannelId::Joystick).is_connected());

        registry.set(ChannelId::Joystick, ConnectionState::Disconnected);
        let next = stalled.try_recv().expect("drained subscriber receives again");
        assert_eq!(next.current, ConnectionState::Disconnected);
    }

    #[test]
    fn concurrent_writes_keep_one_entry_per_channel() {
        let registry = Arc::new(StateRegistry::new());
        let handles: Vec<_> = ChannelId::ALL
            .iter()
            .map(|id| {
                let registry = Arc::clone(&registry);
                let id = *id;
                thread::spawn(move || {
                    for _ in 0..50 {
                        registry.set(id, connected());
                        registry.set(id, ConnectionState::Disconnected);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("writer thread should complete");
        }
        assert_eq!(registry.snapshot().len(), ChannelId::ALL.len());
        assert!(!registry.is_any_connected());
    }
}
