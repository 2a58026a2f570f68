//! Console logging setup for the binaries

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize console logging.
///
/// Reads the filter from `RUST_LOG`, defaulting to info for the charnn crates.
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "info,charnn_finetune=info,charnn_generate=info,charnn_model=info".into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();
}
