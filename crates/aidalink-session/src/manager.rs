//! Per-channel connection lifecycle.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use aidalink_frame::{ChannelId, Header, Message};
use aidalink_transport::{Channel, ChannelConfig, Endpoint, TransportError};
use bytes::Bytes;
use tracing::{debug, info, warn};

use crate::error::{Result, SessionError};
use crate::state::{ConnectionState, StateRegistry};

/// Outcome of a concurrent bring-up, one entry per requested channel.
#[derive(Debug)]
pub struct BringUpReport {
    pub endpoint: Endpoint,
    pub results: Vec<(ChannelId, Result<()>)>,
}

impl BringUpReport {
    /// Channels that ended up connected.
    pub fn connected(&self) -> Vec<ChannelId> {
        self.results
            .iter()
            .filter(|(_, result)| result.is_ok())
            .map(|(id, _)| *id)
            .collect()
    }

    /// Channels that failed, with their errors.
    pub fn failures(&self) -> impl Iterator<Item = (ChannelId, &SessionError)> {
        self.results
            .iter()
            .filter_map(|(id, result)| result.as_ref().err().map(|err| (*id, err)))
    }

    pub fn is_complete(&self) -> bool {
        self.results.iter().all(|(_, result)| result.is_ok())
    }
}

/// Owns at most one open [`Channel`] per [`ChannelId`] and drives the state
/// registry.
///
/// Channels are shared as `Arc` so blocking I/O on one channel never holds
/// the map lock. Dropping the manager closes every channel.
pub struct ConnectionManager {
    channels: Mutex<HashMap<ChannelId, Arc<Channel>>>,
    states: StateRegistry,
    config: ChannelConfig,
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::with_config(ChannelConfig::default())
    }

    /// Socket options applied to every channel opened by this manager. The
    /// connect timeout is overridden per call.
    pub fn with_config(config: ChannelConfig) -> Self {
        Self {
            channels: Mutex::new(HashMap::new()),
            states: StateRegistry::new(),
            config,
        }
    }

    /// Observable per-channel states.
    pub fn states(&self) -> &StateRegistry {
        &self.states
    }

    /// Open a channel, replacing (and closing) any previous one on success.
    pub fn connect(&self, id: ChannelId, host: &str, port: u16, timeout: Duration) -> Result<()> {
        self.states.set(
            id,
            ConnectionState::Connecting {
                host: host.to_string(),
                port,
            },
        );

        let config = self.config.clone().with_connect_timeout(timeout);
        let channel = match Channel::open_with_config(host, port, &config) {
            Ok(channel) => channel,
            Err(err) => return Err(self.fail(id, err.into())),
        };

        if let Some(previous) = self.lock().insert(id, Arc::new(channel)) {
            previous.close();
        }
        self.states.set(
            id,
            ConnectionState::Connected {
                host: host.to_string(),
                port,
            },
        );
        info!(channel = id.name(), host, port, "channel connected");
        Ok(())
    }

    /// Close and forget a channel. No-op when it is not open.
    pub fn disconnect(&self, id: ChannelId) {
        let removed = self.lock().remove(&id);
        if let Some(channel) = removed {
            channel.close();
            self.states.set(id, ConnectionState::Disconnected);
            debug!(channel = id.name(), "channel disconnected");
        }
    }

    /// Write a complete buffer on one channel.
    pub fn send(&self, id: ChannelId, bytes: &[u8]) -> Result<()> {
        let channel = self.channel(id)?;
        channel
            .send(bytes)
            .map_err(|err| self.fail_on(id, &channel, err.into()))
    }

    /// Read exactly `size` bytes from one channel.
    pub fn receive(&self, id: ChannelId, size: usize) -> Result<Bytes> {
        let channel = self.channel(id)?;
        channel
            .receive(size)
            .map_err(|err| self.fail_on(id, &channel, err.into()))
    }

    /// Read and decode the next header on one channel.
    pub fn get_header(&self, id: ChannelId) -> Result<Header> {
        let channel = self.channel(id)?;
        channel
            .get_header()
            .map_err(|err| self.fail_on(id, &channel, err.into()))
    }

    /// Read a header and its body without another reader interleaving.
    pub fn receive_message(&self, id: ChannelId) -> Result<Message> {
        let channel = self.channel(id)?;
        channel
            .receive_message()
            .map_err(|err| self.fail_on(id, &channel, err.into()))
    }

    /// Close and clear every channel. States are left as they are.
    pub fn close_all(&self) {
        let drained: Vec<_> = self.lock().drain().collect();
        for (id, channel) in drained {
            channel.close();
            debug!(channel = id.name(), "channel closed");
        }
    }

    /// Connect several channels to the same endpoint, one thread each.
    ///
    /// Every channel gets its own result; one failure never affects another.
    pub fn connect_all(
        &self,
        targets: &[ChannelId],
        endpoint: &Endpoint,
        timeout: Duration,
    ) -> BringUpReport {
        let results: Vec<(ChannelId, Result<()>)> = thread::scope(|scope| {
            let workers: Vec<_> = targets
                .iter()
                .map(|id| {
                    let id = *id;
                    let worker = scope
                        .spawn(move || self.connect(id, &endpoint.host, endpoint.port, timeout));
                    (id, worker)
                })
                .collect();

            workers
                .into_iter()
                .map(|(id, worker)| {
                    let result = worker.join().unwrap_or_else(|_| {
                        Err(self.fail(id, SessionError::Task("connect worker panicked".into())))
                    });
                    if let Err(err) = &result {
                        warn!(channel = id.name(), %endpoint, error = %err, "channel bring-up failed");
                    }
                    (id, result)
                })
                .collect()
        });

        BringUpReport {
            endpoint: endpoint.clone(),
            results,
        }
    }

    /// Whether a channel is open and its state is `Connected`.
    pub fn is_connected(&self, id: ChannelId) -> bool {
        self.lock().contains_key(&id) && self.states.get(id).is_connected()
    }

    /// Ids of every open channel, in channel order.
    pub fn connected_channels(&self) -> Vec<ChannelId> {
        let channels = self.lock();
        ChannelId::ALL
            .into_iter()
            .filter(|id| channels.contains_key(id))
            .collect()
    }

    fn channel(&self, id: ChannelId) -> Result<Arc<Channel>> {
        self.lock()
            .get(&id)
            .cloned()
            .ok_or(SessionError::NotConnected(id))
    }

    /// Like [`fail`](Self::fail), for an error raised by I/O on `channel`.
    ///
    /// A channel that has since been replaced or removed no longer owns the
    /// id's state, so its errors leave the state alone. The map lock is held
    /// across the check and the update; `connect` publishes the new channel
    /// under that lock before marking it `Connected`.
    fn fail_on(&self, id: ChannelId, channel: &Arc<Channel>, err: SessionError) -> SessionError {
        let channels = self.lock();
        let current = channels
            .get(&id)
            .is_some_and(|open| Arc::ptr_eq(open, channel));
        if current {
            self.fail(id, err)
        } else {
            debug!(channel = id.name(), error = %err, "error from replaced channel ignored");
            err
        }
    }

    /// Apply the error-transition rule and hand the error back.
    fn fail(&self, id: ChannelId, err: SessionError) -> SessionError {
        if let Some(next) = self.states.update(id, |state| state.after_error(&err)) {
            debug!(channel = id.name(), state = next.label(), error = %err, "channel error");
        }
        if let SessionError::Transport(TransportError::Protocol(_)) = &err {
            warn!(channel = id.name(), error = %err, "protocol violation from robot");
        }
        err
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ChannelId, Arc<Channel>>> {
        self.channels.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.close_all();
    }
}
