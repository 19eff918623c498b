#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use waveradio::catalog::Catalog;
use waveradio::radio::create_radio_router;
use waveradio::registry::Payload;
use waveradio::station::SharedStation;
use waveradio::validation::ChannelId;

pub fn channel(id: &str) -> ChannelId {
    ChannelId::new(id).unwrap()
}

/// Everything currently queued for a connection, decoded.
pub fn drain(rx: &mut mpsc::Receiver<Payload>) -> Vec<Value> {
    let mut events = Vec::new();
    while let Ok(payload) = rx.try_recv() {
        events.push(serde_json::from_str(&payload).unwrap());
    }
    events
}

pub fn types_of(events: &[Value]) -> Vec<String> {
    events
        .iter()
        .map(|e| e["type"].as_str().unwrap().to_string())
        .collect()
}

/// One live channel "rock" with tracks A, B, C and an empty channel "quiet".
pub fn test_catalog() -> Catalog {
    Catalog::from_json(
        r#"{
            "channels": [
                {"id": "rock", "name": "Rock", "genre": "Rock", "is_live": true},
                {"id": "quiet", "name": "Quiet", "genre": "Ambient"}
            ],
            "tracks": {
                "rock": [
                    {"id": "A", "title": "Track A", "artist": "Band", "duration": 120},
                    {"id": "B", "title": "Track B", "artist": "Band", "duration": 150},
                    {"id": "C", "title": "Track C", "artist": "Band", "duration": 180}
                ],
                "quiet": []
            }
        }"#,
    )
    .unwrap()
}

/// Serves the radio router for `station` on an ephemeral local port.
pub async fn serve(station: SharedStation) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, create_radio_router(station))
            .await
            .unwrap();
    });

    addr
}

/// Plain HTTP/1.1 GET; returns the status code and body.
pub async fn http_get(addr: SocketAddr, path: &str) -> (u16, String) {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!("GET {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut raw = String::new();
    stream.read_to_string(&mut raw).await.unwrap();

    let status = raw.split_whitespace().nth(1).unwrap().parse().unwrap();
    let body = raw
        .split_once("\r\n\r\n")
        .map(|(_, body)| body.to_string())
        .unwrap_or_default();
    (status, body)
}

/// Waits until the registry reports `expected` listeners on the channel.
pub async fn wait_for_listeners(station: &SharedStation, channel_id: &ChannelId, expected: usize) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while station.listener_count(channel_id) != expected {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap_or_else(|_| {
        panic!(
            "channel {} never reached {} listener(s), has {}",
            channel_id,
            expected,
            station.listener_count(channel_id)
        )
    });
}
