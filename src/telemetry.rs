//! Tracing subscriber setup.

use tracing_subscriber::{
    layer::{Layer, SubscriberExt},
    util::{SubscriberInitExt, TryInitError},
    EnvFilter, Registry,
};

use crate::config::LogFormat;

const DEFAULT_FILTER: &str = "info,storefront_orders=debug,sqlx=warn,tower_http=info";

pub fn init(format: LogFormat) -> Result<(), TryInitError> {
    match format {
        LogFormat::Pretty => init_with_layer(tracing_subscriber::fmt::layer().with_target(true)),
        LogFormat::Json => {
            init_with_layer(tracing_subscriber::fmt::layer().json().with_current_span(true).with_span_list(true))
        }
    }
}

fn init_with_layer<L>(fmt_layer: L) -> Result<(), TryInitError>
where
    L: Layer<Registry> + Send + Sync + 'static,
{
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::registry().with(fmt_layer).with(filter).try_init()
}
