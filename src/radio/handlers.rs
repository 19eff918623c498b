use axum::Json;
use axum::extract::{Path, State};
use chrono::Utc;
use serde_json::json;

use super::error::{RadioError, RadioResult};
use super::station::SharedStation;
use super::types::NowPlayingSnapshot;
use super::validation::ChannelId;

/// Status document served at the root.
pub async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "message": "WaveRadio API",
        "status": "online",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Current track, progress and live listener count of a catalog channel.
pub async fn now_playing(
    State(station): State<SharedStation>,
    Path(channel_id): Path<String>,
) -> RadioResult<Json<NowPlayingSnapshot>> {
    let channel_id = ChannelId::new(channel_id)?;

    station
        .snapshot(&channel_id, Utc::now())
        .map(Json)
        .ok_or_else(|| RadioError::ChannelNotFound(channel_id.to_string()))
}
