use anyhow::{anyhow, Context};
use std::env;
use std::str::FromStr;
use tracing::warn;

const DEFAULT_JWT_SECRET: &str = "change-me";

/// One year.
const MAX_JWT_EXPIRATION_SECONDS: u64 = 365 * 24 * 60 * 60;

/// Server configuration read from the environment (and `.env`, if present).
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_expiration_seconds: u64,
    pub bcrypt_cost: u32,
    pub seed_demo_data: bool,

    /// Seconds between overdue invoice sweeps; `0` disables the sweeper
    pub overdue_sweep_interval_seconds: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let jwt_secret = lookup("JWT_SECRET").unwrap_or_else(|| {
            warn!("JWT_SECRET is not set, falling back to an insecure default");
            DEFAULT_JWT_SECRET.to_string()
        });

        let bcrypt_cost = parse_or(&lookup, "BCRYPT_COST", 10)?;
        if !(4..=31).contains(&bcrypt_cost) {
            return Err(anyhow!("BCRYPT_COST must be between 4 and 31, got {}", bcrypt_cost));
        }

        let jwt_expiration_seconds = parse_or(&lookup, "JWT_EXPIRATION_SECONDS", 86_400)?;
        if !(1..=MAX_JWT_EXPIRATION_SECONDS).contains(&jwt_expiration_seconds) {
            return Err(anyhow!(
                "JWT_EXPIRATION_SECONDS must be between 1 and {}, got {}",
                MAX_JWT_EXPIRATION_SECONDS,
                jwt_expiration_seconds
            ));
        }

        Ok(Config {
            host: lookup("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&lookup, "SERVER_PORT", 5000)?,
            jwt_secret,
            jwt_expiration_seconds,
            bcrypt_cost,
            seed_demo_data: parse_or(&lookup, "SEED_DEMO_DATA", true)?,
            overdue_sweep_interval_seconds: parse_or(&lookup, "OVERDUE_SWEEP_INTERVAL_SECONDS", 3_600)?,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse::<T>().with_context(|| format!("Invalid {}: {:?}", key, raw)),
        None => Ok(default),
    }
}
