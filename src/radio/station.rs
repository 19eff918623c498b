use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::catalog::Catalog;
use super::registry::{ConnectionHandle, ConnectionId, ConnectionRegistry, Payload};
use super::types::{Channel, NowPlaying, NowPlayingSnapshot, ServerEvent, Track};
use super::validation::ChannelId;

/// Everything the radio shares between the rotation loop, the sockets and
/// whoever reads listener counts.
pub struct Station {
    channels: Vec<Channel>,

    /// Maps channel_id -> tracks in airing order; the front airs next
    rotations: DashMap<ChannelId, VecDeque<Track>>,

    /// Maps channel_id -> what it is airing right now
    now_playing: DashMap<ChannelId, NowPlaying>,

    pub registry: ConnectionRegistry,

    queue_capacity: usize,

    /// Cancelled once on shutdown; the rotation loop and every socket watch it
    stop: CancellationToken,
}

/// Helper type for cleaner function signatures
pub type SharedStation = Arc<Station>;

impl Station {
    pub fn new(catalog: Catalog, queue_capacity: usize) -> Self {
        let rotations = DashMap::new();
        for (channel_id, tracks) in catalog.tracks {
            rotations.insert(channel_id, VecDeque::from(tracks));
        }

        tracing::debug!(
            "Station ready with {} channel(s), {} rotation(s)",
            catalog.channels.len(),
            rotations.len()
        );

        Self {
            channels: catalog.channels,
            rotations,
            now_playing: DashMap::new(),
            registry: ConnectionRegistry::new(),
            queue_capacity,
            stop: CancellationToken::new(),
        }
    }

    pub fn shared(catalog: Catalog, queue_capacity: usize) -> SharedStation {
        Arc::new(Self::new(catalog, queue_capacity))
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn channel(&self, channel_id: &ChannelId) -> Option<&Channel> {
        self.channels.iter().find(|c| c.id == *channel_id)
    }

    pub fn listener_count(&self, channel_id: &ChannelId) -> usize {
        self.registry.listener_count(channel_id)
    }

    pub fn now_playing(&self, channel_id: &ChannelId) -> Option<NowPlaying> {
        self.now_playing
            .get(channel_id)
            .map(|entry| entry.value().clone())
    }

    /// What an HTTP reader sees for a catalog channel. Before the first tick
    /// the head of the rotation is reported with no progress.
    pub fn snapshot(
        &self,
        channel_id: &ChannelId,
        now: DateTime<Utc>,
    ) -> Option<NowPlayingSnapshot> {
        let channel = self.channel(channel_id)?.clone();

        let (track, progress) = match self.now_playing(channel_id) {
            Some(current) => {
                let progress = current.progress_at(now);
                (Some(current.track), progress)
            }
            None => (self.rotation(channel_id).into_iter().next(), 0),
        };

        Some(NowPlayingSnapshot {
            channel,
            duration: track.as_ref().map(|t| t.duration).unwrap_or(0),
            track,
            listeners: self.listener_count(channel_id),
            progress,
        })
    }

    /// Snapshot of a channel's rotation, next track first.
    pub fn rotation(&self, channel_id: &ChannelId) -> Vec<Track> {
        self.rotations
            .get(channel_id)
            .map(|tracks| tracks.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Takes the front track of the channel's rotation and moves it to the back.
    /// `None` for unknown channels and empty rotations.
    pub fn advance_rotation(&self, channel_id: &ChannelId) -> Option<Track> {
        let mut tracks = self.rotations.get_mut(channel_id)?;
        let current = tracks.pop_front()?;
        tracks.push_back(current.clone());
        Some(current)
    }

    pub fn set_now_playing(
        &self,
        channel_id: &ChannelId,
        track: Track,
        started_at: DateTime<Utc>,
    ) -> NowPlaying {
        let record = NowPlaying::starting(track, started_at);
        self.now_playing.insert(channel_id.clone(), record.clone());
        record
    }

    /// Opens a listener connection on the channel: registers it (which
    /// announces the listener count) and hands it the current track.
    pub fn connect(&self, channel_id: &ChannelId) -> (ConnectionHandle, mpsc::Receiver<Payload>) {
        let (connection, rx) = ConnectionHandle::new(self.queue_capacity);
        self.registry.register(channel_id, connection.clone());

        if let Some(current) = self.now_playing(channel_id) {
            let event = ServerEvent::NowPlaying {
                channel_id: channel_id.clone(),
                progress: current.progress_at(Utc::now()),
                track: current.track,
            };

            if let Err(e) = self.registry.deliver(channel_id, &connection, &event) {
                tracing::warn!("Could not send now playing to {}: {}", connection.id(), e);
            }
        }

        (connection, rx)
    }

    pub fn disconnect(&self, channel_id: &ChannelId, connection_id: ConnectionId) -> bool {
        self.registry.unregister(channel_id, connection_id)
    }

    pub fn stop_token(&self) -> CancellationToken {
        self.stop.clone()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.stop.is_cancelled()
    }

    /// Stops the rotation loop and closes every listener connection.
    pub fn shutdown(&self) {
        if self.stop.is_cancelled() {
            return;
        }

        tracing::info!("Station shutting down");
        self.stop.cancel();
        self.registry.close_all();
    }
}
