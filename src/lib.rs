//! Student Election Engine
//!
//! Ballot lifecycle, tally and archive rules for a student election. Storage and
//! device-local flags are consumed through traits; an in-memory store ships
//! with the crate.

pub mod config;
pub mod election;
pub mod errors;
pub mod integrity;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use election::ElectionContext;
pub use errors::{Error, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the election engine with logging configured from the environment
pub fn init() -> Result<()> {
    init_with(&config::LoggingConfig::from_env()?)
}

/// Install the tracing subscriber described by `logging`
///
/// `RUST_LOG` takes precedence over the configured level when set.
pub fn init_with(logging: &config::LoggingConfig) -> Result<()> {
    logging.validate()?;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| logging.filter_directive().into());
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let installed = match logging.format.as_str() {
        "json" => builder.json().try_init(),
        "pretty" => builder.pretty().try_init(),
        _ => builder.compact().try_init(),
    };
    installed.map_err(|e| Error::internal(format!("Failed to install subscriber: {e}")))?;

    tracing::info!(
        "🗳️  Student election engine v{} initialized (level={}, format={})",
        VERSION,
        logging.level,
        logging.format
    );
    Ok(())
}
