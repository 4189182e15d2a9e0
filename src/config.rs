use std::env;
use std::fmt::Display;
use std::str::FromStr;

use tracing::{info, warn};

/// Runtime configuration, read once at startup from the environment.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_addr: String,
    pub mongodb_uri: String,
    pub database_name: String,
    /// Prefix for the claim/manage links handed back on campaign creation.
    pub base_url: String,
    /// Shared secret for the human-verification service; claims are
    /// admitted with a warning when it is absent.
    pub verification_secret: Option<String>,
    /// Claim requests admitted per client address per minute.
    pub claim_rate_limit: u32,
}

impl Config {
    pub fn load() -> Config {
        Config {
            bind_addr: load_or("PROMO_BIND_ADDR", "127.0.0.1:8080"),
            mongodb_uri: load_or("PROMO_MONGODB_URI", "mongodb://localhost:27017"),
            database_name: load_or("PROMO_DATABASE", "promo"),
            base_url: load_or("PROMO_BASE_URL", "http://localhost:8080"),
            verification_secret: load_optional("PROMO_VERIFICATION_SECRET"),
            claim_rate_limit: load_or("PROMO_CLAIM_RATE_LIMIT", "30"),
        }
    }
}

fn load_or<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    let value = env::var(key).unwrap_or_else(|_| {
        info!("{} not set, using default: {}", key, default);
        default.to_string()
    });

    match value.parse() {
        Ok(value) => value,
        Err(err) => {
            warn!("invalid {} value ({}), using default: {}", key, err, default);
            default.parse().unwrap_or_else(|_| unreachable!())
        }
    }
}

fn load_optional(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(value) if !value.is_empty() => Some(value),
        _ => {
            warn!("{} not set", key);
            None
        }
    }
}
