use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::Deserialize;

use super::error::{RadioError, RadioResult};
use super::types::{Channel, Track};
use super::validation::ChannelId;

/// Channels and the initial order of their track rotations.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Catalog {
    pub channels: Vec<Channel>,
    #[serde(default)]
    pub tracks: BTreeMap<ChannelId, Vec<Track>>,
}

impl Catalog {
    /// Reads a JSON catalog from disk.
    pub async fn load(path: &Path) -> RadioResult<Self> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| RadioError::Catalog(format!("{}: {}", path.display(), e)))?;

        tracing::info!("Loading catalog from {}", path.display());
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> RadioResult<Self> {
        let catalog: Catalog =
            serde_json::from_str(raw).map_err(|e| RadioError::Catalog(e.to_string()))?;
        catalog.validated()
    }

    /// Rejects duplicate channels and drops rotations of unknown channels.
    pub fn validated(mut self) -> RadioResult<Self> {
        let mut seen = HashSet::new();
        for channel in &self.channels {
            if !seen.insert(channel.id.clone()) {
                return Err(RadioError::Catalog(format!(
                    "channel {} is listed twice",
                    channel.id
                )));
            }
        }

        self.tracks.retain(|channel_id, tracks| {
            let known = seen.contains(channel_id);
            if !known {
                tracing::warn!(
                    "Dropping {} track(s) for unknown channel {}",
                    tracks.len(),
                    channel_id
                );
            }
            known
        });

        Ok(self)
    }

    /// The demo line-up served when no catalog file is configured.
    pub fn builtin() -> Self {
        let channels = vec![
            channel(
                "1",
                "Chill Lo-Fi",
                "Relaxing lo-fi beats to study and chill",
                "Lo-Fi",
                "https://images.unsplash.com/photo-1511379938547-c1f69419868d?w=400&h=400&fit=crop",
                "#B45309",
                true,
                "https://stream.example.com/lofi",
            ),
            channel(
                "2",
                "Deep Focus",
                "Minimal electronic for deep work",
                "Electronic",
                "https://images.unsplash.com/photo-1571330735066-03aaa9429d89?w=400&h=400&fit=crop",
                "#0F766E",
                true,
                "https://stream.example.com/focus",
            ),
            channel(
                "3",
                "Jazz Lounge",
                "Smooth jazz and classic standards",
                "Jazz",
                "https://images.unsplash.com/photo-1511192336575-5a79af67b7f6?w=400&h=400&fit=crop",
                "#059669",
                false,
                "https://stream.example.com/jazz",
            ),
        ];

        let mut tracks = BTreeMap::new();
        tracks.insert(
            builtin_id("1"),
            vec![
                track(
                    "101",
                    "Sunset Dreams",
                    "Lofi Producer",
                    "Chill Vibes",
                    183,
                    "https://images.unsplash.com/photo-1511379938547-c1f69419868d?w=300&h=300&fit=crop",
                ),
                track(
                    "102",
                    "Rainy Window",
                    "Ambient Soul",
                    "Urban Sounds",
                    215,
                    "https://images.unsplash.com/photo-1470225620780-dba8ba36b745?w=300&h=300&fit=crop",
                ),
            ],
        );
        tracks.insert(
            builtin_id("2"),
            vec![track(
                "201",
                "Digital Ocean",
                "Deep Focus",
                "Productive Hours",
                324,
                "https://images.unsplash.com/photo-1571330735066-03aaa9429d89?w=300&h=300&fit=crop",
            )],
        );
        tracks.insert(
            builtin_id("3"),
            vec![track(
                "301",
                "Midnight Jazz",
                "Smooth Operator",
                "Night Sessions",
                245,
                "https://images.unsplash.com/photo-1511192336575-5a79af67b7f6?w=300&h=300&fit=crop",
            )],
        );

        Self { channels, tracks }
    }
}

fn builtin_id(id: &'static str) -> ChannelId {
    ChannelId::from_static(id)
}

#[allow(clippy::too_many_arguments)]
fn channel(
    id: &'static str,
    name: &str,
    description: &str,
    genre: &str,
    image_url: &str,
    color: &str,
    is_live: bool,
    stream_url: &str,
) -> Channel {
    Channel {
        id: builtin_id(id),
        name: name.to_string(),
        description: Some(description.to_string()),
        genre: genre.to_string(),
        image_url: Some(image_url.to_string()),
        color: Some(color.to_string()),
        is_live,
        stream_url: Some(stream_url.to_string()),
    }
}

fn track(id: &str, title: &str, artist: &str, album: &str, duration: u32, cover_art: &str) -> Track {
    Track {
        id: id.to_string(),
        title: title.to_string(),
        artist: artist.to_string(),
        album: Some(album.to_string()),
        duration,
        cover_art: Some(cover_art.to_string()),
        affiliate_links: None,
    }
}
