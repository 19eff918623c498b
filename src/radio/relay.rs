use chrono::Utc;

use super::registry::ConnectionHandle;
use super::station::Station;
use super::types::{ClientMessage, ServerEvent};
use super::validation::ChannelId;

const ANONYMOUS: &str = "anonymous";

/// Parses one text frame from a listener and acts on it.
///
/// Frames that are not valid client messages are logged and dropped; the
/// connection stays open.
pub fn handle_client_text(
    station: &Station,
    channel_id: &ChannelId,
    sender: &ConnectionHandle,
    text: &str,
) {
    tracing::trace!("Received message on {}: {}", channel_id, text);

    match serde_json::from_str::<ClientMessage>(text) {
        Ok(msg) => handle_client_message(station, channel_id, sender, msg),
        Err(e) => {
            tracing::warn!("Failed to parse message from {}: {}", sender.id(), e);
        }
    }
}

/// Routes a parsed client message: chat and likes go to the whole channel,
/// pings are answered to the sender only.
pub fn handle_client_message(
    station: &Station,
    channel_id: &ChannelId,
    sender: &ConnectionHandle,
    msg: ClientMessage,
) {
    let event = match msg {
        ClientMessage::UserMessage { content, user_id } => ServerEvent::UserMessage {
            user_id: user_id.unwrap_or_else(|| ANONYMOUS.to_string()),
            content,
            timestamp: Utc::now(),
        },

        ClientMessage::TrackLike { track_id, user_id } => ServerEvent::TrackLike {
            track_id,
            user_id: user_id.unwrap_or_else(|| ANONYMOUS.to_string()),
            timestamp: Utc::now(),
        },

        ClientMessage::Ping => {
            if let Err(e) = station
                .registry
                .deliver(channel_id, sender, &ServerEvent::Pong)
            {
                tracing::debug!("Pong to {} not delivered: {}", sender.id(), e);
            }
            return;
        }

        ClientMessage::Unknown => {
            tracing::trace!("Ignoring unknown message type from {}", sender.id());
            return;
        }
    };

    match station.registry.broadcast(channel_id, &event) {
        Ok(report) => {
            tracing::debug!(
                "Relayed message from {} to {} listener(s) on {}",
                sender.id(),
                report.delivered,
                channel_id
            );
        }
        Err(e) => tracing::error!("Failed to relay message on {}: {}", channel_id, e),
    }
}
