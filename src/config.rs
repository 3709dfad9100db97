//! Service configuration, read from flags, the environment and `.env`.

use clap::{Parser, ValueEnum};
use rust_decimal::Decimal;

use crate::domain::pricing::PricingPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "storefront-orders", about = "Storefront cart, coupon and order service", long_about = None)]
pub struct Config {
    /// Postgres connection string
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    #[arg(long, env = "DATABASE_MAX_CONNECTIONS", default_value_t = 10)]
    pub database_max_connections: u32,

    #[arg(short = 'H', long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(short, long, env = "PORT", default_value_t = 8083)]
    pub port: u16,

    /// Flat shipping fee added to every order
    #[arg(long, env = "SHIPPING_FLAT_FEE", default_value = "15.00")]
    pub shipping_flat_fee: Decimal,

    /// Tax rate applied to the discounted subtotal, e.g. 0.08
    #[arg(long, env = "TAX_RATE", default_value = "0.08")]
    pub tax_rate: Decimal,

    /// Include internal error details in 500 responses
    #[arg(long, env = "APP_DEBUG", default_value_t = false)]
    pub debug: bool,

    /// NATS server for domain events; events are only logged when unset
    #[arg(long, env = "NATS_URL")]
    pub nats_url: Option<String>,

    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

impl Config {
    /// Loads `.env` if present, then parses flags and environment.
    pub fn load() -> Result<Self, clap::Error> {
        _ = dotenvy::dotenv();
        Self::try_parse()
    }

    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn pricing(&self) -> PricingPolicy {
        PricingPolicy { shipping_fee: self.shipping_flat_fee, tax_rate: self.tax_rate }
    }
}
