pub mod catalog;
pub mod config;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod registry;
pub mod relay;
pub mod rotation;
pub mod socket;
pub mod station;
pub mod types;
pub mod validation;

pub use catalog::Catalog;
pub use config::RadioConfig;
pub use error::{DeliveryError, RadioError, RadioResult};
pub use registry::{BroadcastReport, ConnectionHandle, ConnectionId, ConnectionRegistry};
pub use rotation::RotationLoop;
pub use station::{SharedStation, Station};
pub use types::{Channel, ClientMessage, NowPlaying, NowPlayingSnapshot, ServerEvent, Track};
pub use validation::ChannelId;

use axum::Router;
use axum::routing::get;

use self::handlers::{now_playing, root};
use self::logging::init_logging;
use self::socket::radio_websocket;

/// Creates an Axum router with the radio routes attached to `station`.
pub fn create_radio_router(station: SharedStation) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/channels/{channel_id}/now-playing", get(now_playing)) // Read-only snapshot
        .route("/ws/{channel_id}", get(radio_websocket)) // Channel WebSocket
        .with_state(station)
}

/// Builds the station described by `config`.
pub async fn init_station(config: &RadioConfig) -> RadioResult<SharedStation> {
    let catalog = match &config.catalog_path {
        Some(path) => Catalog::load(path).await?,
        None => Catalog::builtin(),
    };

    Ok(Station::shared(catalog, config.queue_capacity))
}

/// Starts the radio server: binds, starts the rotation loop and serves
/// until Ctrl+C, then shuts the station down.
pub async fn initialize(config: RadioConfig) -> RadioResult<()> {
    // Set up tracing/logging
    init_logging();

    tracing::info!("Starting WaveRadio server");

    let station = init_station(&config).await?;

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    let addr = listener.local_addr()?;

    tracing::info!("✓ WaveRadio listening on http://{}", addr);

    let rotation = RotationLoop::new(station.clone(), config.rotation_interval);
    let rotation_task = tokio::spawn(rotation.run(station.stop_token()));

    let router = create_radio_router(station.clone());

    let shutdown_station = station.clone();
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
            tracing::info!("Ctrl+C received");
            shutdown_station.shutdown();
        })
        .await?;

    // Covers the serve loop ending for reasons other than Ctrl+C
    station.shutdown();
    if let Err(e) = rotation_task.await {
        tracing::error!("Rotation loop ended abnormally: {}", e);
    }

    tracing::info!("WaveRadio stopped");
    Ok(())
}
