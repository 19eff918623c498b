use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::validation::ChannelId;

/// Display metadata for a radio channel.
///
/// The live listener count is deliberately absent: it is read from the
/// connection registry whenever it is needed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub id: ChannelId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub genre: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub is_live: bool,
    #[serde(default)]
    pub stream_url: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub title: String,
    pub artist: String,
    #[serde(default)]
    pub album: Option<String>,
    /// Length in seconds
    pub duration: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_art: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affiliate_links: Option<BTreeMap<String, String>>,
}

/// What a channel is currently airing.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NowPlaying {
    pub track: Track,
    pub started_at: DateTime<Utc>,
    pub progress: u32,
}

impl NowPlaying {
    pub fn starting(track: Track, started_at: DateTime<Utc>) -> Self {
        Self {
            track,
            started_at,
            progress: 0,
        }
    }

    /// Whole seconds elapsed since the track started, capped at its duration.
    pub fn progress_at(&self, now: DateTime<Utc>) -> u32 {
        let elapsed = (now - self.started_at).num_seconds().max(0);
        u32::try_from(elapsed)
            .unwrap_or(u32::MAX)
            .min(self.track.duration)
    }
}

/// Read-only view of a channel for HTTP clients.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NowPlayingSnapshot {
    pub channel: Channel,
    pub track: Option<Track>,
    pub listeners: usize,
    pub progress: u32,
    pub duration: u32,
}

/// Messages a listener may send over its channel socket.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// A dedication or shoutout to everyone on the channel
    UserMessage {
        content: String,
        #[serde(default)]
        user_id: Option<String>,
    },

    TrackLike {
        track_id: String,
        #[serde(default)]
        user_id: Option<String>,
    },

    /// Heartbeat, answered with a pong to the sender only
    Ping,

    /// Anything with a `type` we do not know about
    #[serde(other)]
    Unknown,
}

/// Messages the server pushes to listeners.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    ListenerCount {
        channel_id: ChannelId,
        count: usize,
    },

    NowPlaying {
        channel_id: ChannelId,
        track: Track,
        progress: u32,
    },

    UserMessage {
        user_id: String,
        content: String,
        timestamp: DateTime<Utc>,
    },

    TrackLike {
        track_id: String,
        user_id: String,
        timestamp: DateTime<Utc>,
    },

    Pong,
}
