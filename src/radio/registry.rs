use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use uuid::Uuid;

use super::error::DeliveryError;
use super::types::ServerEvent;
use super::validation::ChannelId;

pub type ConnectionId = Uuid;

/// Serialized event, shared by every connection it is fanned out to.
pub type Payload = Arc<str>;

/// Outbound half of one listener connection.
///
/// The socket's send task owns the matching receiver and writes whatever
/// arrives to the WebSocket. Dropping every handle closes that queue.
#[derive(Clone, Debug)]
pub struct ConnectionHandle {
    id: ConnectionId,
    tx: mpsc::Sender<Payload>,
}

impl ConnectionHandle {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Payload>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let handle = Self {
            id: Uuid::new_v4(),
            tx,
        };
        (handle, rx)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Non-blocking hand-off to the connection's send task.
    pub fn try_deliver(&self, payload: Payload) -> Result<(), DeliveryError> {
        self.tx.try_send(payload).map_err(|e| match e {
            TrySendError::Closed(_) => DeliveryError::Closed,
            TrySendError::Full(_) => DeliveryError::Backlogged,
        })
    }

    /// A reference that does not keep the outbound queue open.
    pub fn downgrade(&self) -> WeakConnection {
        WeakConnection {
            id: self.id,
            tx: self.tx.downgrade(),
        }
    }
}

/// Held by a socket's receive side so that only the registry keeps the
/// queue alive: once the registry lets go, the send side drains and stops.
#[derive(Clone, Debug)]
pub struct WeakConnection {
    id: ConnectionId,
    tx: mpsc::WeakSender<Payload>,
}

impl WeakConnection {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn upgrade(&self) -> Option<ConnectionHandle> {
        self.tx.upgrade().map(|tx| ConnectionHandle { id: self.id, tx })
    }
}

/// Outcome of one fan-out.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct BroadcastReport {
    pub delivered: usize,
    /// Connections that were dropped from the channel, and why
    pub failures: Vec<(ConnectionId, DeliveryError)>,
}

fn encode(event: &ServerEvent) -> Result<Payload, DeliveryError> {
    serde_json::to_string(event)
        .map(Payload::from)
        .map_err(|e| DeliveryError::Encode(e.to_string()))
}

/// Per-channel set of open listener connections.
///
/// The listener count of a channel is the length of its entry; nothing else
/// counts listeners.
#[derive(Default)]
pub struct ConnectionRegistry {
    channels: DashMap<ChannelId, Vec<ConnectionHandle>>,

    /// Reverse map: connection -> the channel it is registered under.
    /// Keeps a connection in at most one channel.
    connection_channel: DashMap<ConnectionId, ChannelId>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `connection` under `channel_id` and announces the new listener
    /// count to the whole channel, the new connection included.
    ///
    /// A connection already registered under another channel is moved.
    pub fn register(&self, channel_id: &ChannelId, connection: ConnectionHandle) {
        let id = connection.id();

        if let Some(previous) = self.connection_channel.insert(id, channel_id.clone())
            && previous != *channel_id
        {
            tracing::debug!("Moving connection {} from {} to {}", id, previous, channel_id);
            if self.remove_from(&previous, id) {
                self.announce_listener_count(&previous);
            }
        }

        {
            let mut connections = self.channels.entry(channel_id.clone()).or_default();
            if !connections.iter().any(|c| c.id() == id) {
                connections.push(connection);
            }
        }

        tracing::info!(
            "Connection {} registered on channel {} ({} listeners)",
            id,
            channel_id,
            self.listener_count(channel_id)
        );

        self.announce_listener_count(channel_id);
    }

    /// Removes the connection from the channel. Returns whether anything was
    /// removed; a second call for the same connection is a no-op.
    pub fn unregister(&self, channel_id: &ChannelId, connection_id: ConnectionId) -> bool {
        if !self.remove_from(channel_id, connection_id) {
            return false;
        }

        self.connection_channel
            .remove_if(&connection_id, |_, registered| registered == channel_id);

        tracing::info!(
            "Connection {} unregistered from channel {} ({} listeners)",
            connection_id,
            channel_id,
            self.listener_count(channel_id)
        );

        self.announce_listener_count(channel_id);
        true
    }

    /// Best-effort fan-out of `event` to every connection on the channel.
    ///
    /// Connections that cannot take the event are unregistered and the
    /// survivors are told the new listener count. Only an encoding failure
    /// is returned as an error; nobody is dropped in that case.
    pub fn broadcast(
        &self,
        channel_id: &ChannelId,
        event: &ServerEvent,
    ) -> Result<BroadcastReport, DeliveryError> {
        let payload = encode(event)?;
        let report = self.fan_out(channel_id, &payload);

        if !report.failures.is_empty() {
            self.announce_listener_count(channel_id);
        }

        Ok(report)
    }

    /// Sends `event` to a single connection. A dead connection is
    /// unregistered from `channel_id`.
    pub fn deliver(
        &self,
        channel_id: &ChannelId,
        connection: &ConnectionHandle,
        event: &ServerEvent,
    ) -> Result<(), DeliveryError> {
        let payload = encode(event)?;

        connection.try_deliver(payload).inspect_err(|e| {
            tracing::debug!("Direct delivery to {} failed: {}", connection.id(), e);
            if e.is_dead_connection() {
                self.unregister(channel_id, connection.id());
            }
        })
    }

    pub fn listener_count(&self, channel_id: &ChannelId) -> usize {
        self.channels
            .get(channel_id)
            .map(|connections| connections.len())
            .unwrap_or(0)
    }

    pub fn total_listeners(&self) -> usize {
        self.channels.iter().map(|entry| entry.value().len()).sum()
    }

    pub fn channel_of(&self, connection_id: ConnectionId) -> Option<ChannelId> {
        self.connection_channel
            .get(&connection_id)
            .map(|entry| entry.value().clone())
    }

    /// Drops every registered connection, which closes their outbound queues.
    pub fn close_all(&self) -> usize {
        let closed = self.total_listeners();
        self.channels.clear();
        self.connection_channel.clear();
        tracing::info!("Closed {} connection(s)", closed);
        closed
    }

    /// Tells everybody on the channel how many listeners it has. Connections
    /// that fail this announcement are dropped and the survivors get a fresh
    /// count, until a round goes through cleanly.
    fn announce_listener_count(&self, channel_id: &ChannelId) {
        loop {
            let event = ServerEvent::ListenerCount {
                channel_id: channel_id.clone(),
                count: self.listener_count(channel_id),
            };

            let payload = match encode(&event) {
                Ok(payload) => payload,
                Err(e) => {
                    tracing::error!("Failed to encode listener count for {}: {}", channel_id, e);
                    return;
                }
            };

            if self.fan_out(channel_id, &payload).failures.is_empty() {
                return;
            }
        }
    }

    /// Delivers a ready payload and prunes connections that fail.
    fn fan_out(&self, channel_id: &ChannelId, payload: &Payload) -> BroadcastReport {
        let mut report = BroadcastReport::default();

        let now_empty = {
            let Some(mut connections) = self.channels.get_mut(channel_id) else {
                return report;
            };

            // One failing connection must not keep the rest from receiving
            connections.retain(|connection| match connection.try_deliver(payload.clone()) {
                Ok(()) => {
                    report.delivered += 1;
                    true
                }
                Err(e) => {
                    tracing::debug!(
                        "Dropping connection {} from {}: {}",
                        connection.id(),
                        channel_id,
                        e
                    );
                    report.failures.push((connection.id(), e));
                    false
                }
            });

            connections.is_empty()
        };

        if now_empty {
            self.channels
                .remove_if(channel_id, |_, connections| connections.is_empty());
        }

        for (connection_id, _) in &report.failures {
            self.connection_channel
                .remove_if(connection_id, |_, registered| registered == channel_id);
        }

        if !report.failures.is_empty() {
            tracing::info!(
                "Broadcast on {} reached {} listener(s), dropped {}",
                channel_id,
                report.delivered,
                report.failures.len()
            );
        } else {
            tracing::trace!(
                "Broadcast on {} reached {} listener(s)",
                channel_id,
                report.delivered
            );
        }

        report
    }

    fn remove_from(&self, channel_id: &ChannelId, connection_id: ConnectionId) -> bool {
        let (removed, now_empty) = {
            let Some(mut connections) = self.channels.get_mut(channel_id) else {
                return false;
            };
            let before = connections.len();
            connections.retain(|c| c.id() != connection_id);
            (connections.len() < before, connections.is_empty())
        };

        if now_empty {
            self.channels
                .remove_if(channel_id, |_, connections| connections.is_empty());
        }

        removed
    }
}
