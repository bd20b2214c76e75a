use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use corkboard_api::sessions::MAX_SESSION_TTL;

/// Runtime configuration, read from the environment (and `.env` if present).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub db_path: PathBuf,
    pub addr: SocketAddr,
    pub session_ttl: Duration,
    pub sweep_interval: Duration,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let db_path = lookup("CORKBOARD_DB_PATH").unwrap_or_else(|| "corkboard.db".into());
        let host = lookup("CORKBOARD_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = parse_or(&lookup, "CORKBOARD_PORT", 3000)?;
        let ttl_hours: u64 = parse_or(&lookup, "CORKBOARD_SESSION_TTL_HOURS", 720)?; // 30 days
        let sweep_secs: u64 = parse_or(&lookup, "CORKBOARD_SESSION_SWEEP_SECS", 3600)?;

        let session_ttl = ttl_hours
            .checked_mul(3600)
            .map(Duration::from_secs)
            .filter(|ttl| *ttl <= MAX_SESSION_TTL)
            .with_context(|| {
                format!(
                    "CORKBOARD_SESSION_TTL_HOURS must be at most {}, got {}",
                    MAX_SESSION_TTL.as_secs() / 3600,
                    ttl_hours
                )
            })?;

        let addr = format!("{}:{}", host, port)
            .parse::<SocketAddr>()
            .with_context(|| format!("invalid bind address {}:{}", host, port))?;

        Ok(Self {
            db_path: db_path.into(),
            addr,
            session_ttl,
            sweep_interval: Duration::from_secs(sweep_secs.max(1)),
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a number, got {:?}", key, raw)),
        None => Ok(default),
    }
}
