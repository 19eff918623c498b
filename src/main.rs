use waveradio::radio::{self, RadioConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = RadioConfig::from_env()?;
    radio::initialize(config).await?;
    Ok(())
}
