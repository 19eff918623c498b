use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;

use super::relay::handle_client_text;
use super::station::SharedStation;
use super::validation::ChannelId;

const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// WebSocket entrypoint for a channel's listeners.
/// Only validates the channel id; the connection lifecycle lives in
/// `handle_radio_connection`.
pub async fn radio_websocket(
    ws: WebSocketUpgrade,
    State(station): State<SharedStation>,
    Path(channel_id): Path<String>,
) -> Response {
    let channel_id = match ChannelId::new(channel_id) {
        Ok(id) => id,
        Err(e) => {
            tracing::warn!("Rejected WebSocket connection: {}", e);
            return e.into_response();
        }
    };

    if station.is_shutting_down() {
        return (StatusCode::SERVICE_UNAVAILABLE, "Station is shutting down").into_response();
    }

    ws.on_upgrade(move |socket| handle_radio_connection(socket, station, channel_id))
}

/// Manages the full lifecycle of one listener socket.
async fn handle_radio_connection(socket: WebSocket, station: SharedStation, channel_id: ChannelId) {
    let (mut sender, mut receiver) = socket.split();

    // Registers and queues the listener count and current track for us
    let (connection, mut out_rx) = station.connect(&channel_id);
    let connection_id = connection.id();

    // Only the registry keeps the queue open, so dropping us from the
    // registry ends the send task
    let weak_connection = connection.downgrade();
    drop(connection);

    tracing::info!("Client {} connected to channel {}", connection_id, channel_id);

    // Send task: drains the outbound queue into the socket
    let mut send_task = tokio::spawn(async move {
        while let Some(payload) = out_rx.recv().await {
            if let Err(e) = sender.send(Message::Text(payload.to_string().into())).await {
                tracing::debug!("Failed to send to {}: {}", connection_id, e);
                return;
            }
        }

        tracing::debug!("Outbound queue of {} closed", connection_id);
        let _ = sender.send(Message::Close(None)).await;
    });

    // Receive task
    let station_clone = station.clone();
    let channel_clone = channel_id.clone();

    let mut receive_task = tokio::spawn(async move {
        while let Some(msg_result) = receiver.next().await {
            match msg_result {
                Ok(Message::Text(text)) => {
                    let Some(connection) = weak_connection.upgrade() else {
                        tracing::debug!("Connection {} no longer registered", weak_connection.id());
                        break;
                    };
                    handle_client_text(&station_clone, &channel_clone, &connection, text.as_str());
                }
                Ok(Message::Close(_)) => {
                    tracing::info!("Client {} closed connection", weak_connection.id());
                    break;
                }
                Err(e) => {
                    tracing::warn!("WebSocket error on {}: {}", weak_connection.id(), e);
                    break;
                }
                _ => {}
            }
        }

        tracing::debug!("Receive task ended");
    });

    let stop = station.stop_token();

    // Wait for either task to complete (or shutdown), then abort the other too
    tokio::select! {
        _ = &mut send_task => {
            tracing::debug!("Send task completed, aborting receive task");
            receive_task.abort();
        }
        _ = &mut receive_task => {
            tracing::debug!("Receive task completed, aborting send task");
            send_task.abort();
        }
        _ = stop.cancelled() => {
            tracing::debug!("Station stopping, closing {}", connection_id);
            receive_task.abort();
            // close_all dropped our queue; let the send task flush and say goodbye
            if tokio::time::timeout(CLOSE_GRACE, &mut send_task).await.is_err() {
                send_task.abort();
            }
        }
    }

    station.disconnect(&channel_id, connection_id);

    tracing::info!("Client {} disconnected from channel {}", connection_id, channel_id);
}
