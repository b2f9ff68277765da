use std::env;

use anyhow::{Context, bail};
use rust_decimal::Decimal;

/// Default platform share of a completed order.
pub const DEFAULT_COMMISSION_RATE: &str = "0.10";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub max_connections: u32,
    pub jwt_secret: String,
    pub orders: OrderSettings,
}

/// Knobs of the order services, passed in through [`crate::state::AppState`].
#[derive(Debug, Clone, PartialEq)]
pub struct OrderSettings {
    pub commission_rate: Decimal,
}

impl OrderSettings {
    pub fn new(commission_rate: Decimal) -> anyhow::Result<Self> {
        if commission_rate < Decimal::ZERO || commission_rate > Decimal::ONE {
            bail!("commission rate must be between 0 and 1, got {commission_rate}");
        }
        Ok(Self { commission_rate })
    }
}

impl Default for OrderSettings {
    fn default() -> Self {
        Self {
            commission_rate: Decimal::new(10, 2),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET is not set")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let max_connections = env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|n| n.parse::<u32>().ok())
            .unwrap_or(10);
        let rate = env::var("COMMISSION_RATE")
            .unwrap_or_else(|_| DEFAULT_COMMISSION_RATE.to_string())
            .parse::<Decimal>()
            .context("COMMISSION_RATE is not a decimal")?;

        Ok(Self {
            port,
            database_url,
            host,
            max_connections,
            jwt_secret,
            orders: OrderSettings::new(rate)?,
        })
    }
}
