use std::time::Duration;

use chrono::Utc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::station::SharedStation;
use super::types::{ServerEvent, Track};
use super::validation::ChannelId;

/// A track that went on air during a tick.
#[derive(Debug, Clone, PartialEq)]
pub struct Rotated {
    pub channel_id: ChannelId,
    pub track: Track,
    /// Listeners that received the now playing event
    pub delivered: usize,
}

/// Simulated playback: every interval each channel moves on to the next
/// track of its rotation and announces it.
pub struct RotationLoop {
    station: SharedStation,
    interval: Duration,
}

impl RotationLoop {
    pub fn new(station: SharedStation, interval: Duration) -> Self {
        Self { station, interval }
    }

    /// One pass over every channel. Channels with an empty rotation are
    /// skipped; a failed broadcast on one channel does not affect the others.
    pub fn tick(&self) -> Vec<Rotated> {
        let mut rotated = Vec::new();

        for channel in self.station.channels() {
            let channel_id = &channel.id;

            let Some(track) = self.station.advance_rotation(channel_id) else {
                continue;
            };

            self.station
                .set_now_playing(channel_id, track.clone(), Utc::now());

            let event = ServerEvent::NowPlaying {
                channel_id: channel_id.clone(),
                track: track.clone(),
                progress: 0,
            };

            let delivered = match self.station.registry.broadcast(channel_id, &event) {
                Ok(report) => report.delivered,
                Err(e) => {
                    tracing::error!("Now playing broadcast failed on {}: {}", channel_id, e);
                    0
                }
            };

            tracing::debug!(
                "Channel {} now playing {} - {} ({} listener(s))",
                channel_id,
                track.artist,
                track.title,
                delivered
            );

            rotated.push(Rotated {
                channel_id: channel_id.clone(),
                track,
                delivered,
            });
        }

        rotated
    }

    /// Ticks immediately, then once per interval, until `stop` is cancelled.
    pub async fn run(self, stop: CancellationToken) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!("Rotation loop started ({:?} per track)", self.interval);

        loop {
            tokio::select! {
                biased;

                _ = stop.cancelled() => break,

                _ = interval.tick() => {
                    self.tick();
                }
            }
        }

        tracing::info!("Rotation loop stopped");
    }
}
