use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use super::error::{RadioError, RadioResult};

pub const ADDR_VAR: &str = "WAVERADIO_ADDR";
pub const ROTATION_SECS_VAR: &str = "WAVERADIO_ROTATION_SECS";
pub const QUEUE_CAPACITY_VAR: &str = "WAVERADIO_QUEUE_CAPACITY";
pub const CATALOG_VAR: &str = "WAVERADIO_CATALOG";

#[derive(Debug, Clone, PartialEq)]
pub struct RadioConfig {
    pub bind_addr: SocketAddr,
    /// How long each track stays "now playing"
    pub rotation_interval: Duration,
    /// Events buffered per connection before it counts as dead
    pub queue_capacity: usize,
    /// JSON catalog; the built-in demo line-up when absent
    pub catalog_path: Option<PathBuf>,
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            rotation_interval: Duration::from_secs(30),
            queue_capacity: 32,
            catalog_path: None,
        }
    }
}

impl RadioConfig {
    pub fn from_env() -> RadioResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup, so tests need not touch the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> RadioResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let bind_addr = parse_var(&lookup, ADDR_VAR)?.unwrap_or(defaults.bind_addr);

        let rotation_secs: Option<u64> = parse_var(&lookup, ROTATION_SECS_VAR)?;
        let rotation_interval = match rotation_secs {
            Some(0) => {
                return Err(RadioError::Config(format!(
                    "{} must be greater than zero",
                    ROTATION_SECS_VAR
                )));
            }
            Some(secs) => Duration::from_secs(secs),
            None => defaults.rotation_interval,
        };

        let queue_capacity = match parse_var(&lookup, QUEUE_CAPACITY_VAR)? {
            Some(0) => {
                return Err(RadioError::Config(format!(
                    "{} must be greater than zero",
                    QUEUE_CAPACITY_VAR
                )));
            }
            Some(capacity) => capacity,
            None => defaults.queue_capacity,
        };

        let catalog_path = lookup(CATALOG_VAR)
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            bind_addr,
            rotation_interval,
            queue_capacity,
            catalog_path,
        })
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> RadioResult<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| RadioError::Config(format!("{}={:?}: {}", key, raw, e))),
    }
}
