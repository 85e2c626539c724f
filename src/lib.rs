//! Kismet meta-GPS bridge for gpsd.
//!
//! This crate streams position fixes from a local gpsd daemon to a Kismet
//! server's meta-GPS websocket endpoint, reconnecting both sides whenever
//! either fails:
//!
//! - [`gpsd`] - gpsd JSON protocol client (TPV fix stream)
//! - [`kismet`] - websocket client for the meta-GPS update endpoint
//! - [`message`] - wire message and the fix translation rule
//! - [`bridge`] - the resilient streaming loop
//! - [`config`] - CLI and JSON5 configuration
//! - [`shutdown`] - cooperative shutdown signaling

pub mod bridge;
pub mod config;
pub mod gpsd;
pub mod kismet;
pub mod message;
pub mod shutdown;

// Re-export commonly used types at the crate root
pub use bridge::{BridgeError, GpsBridge};
pub use config::{BridgeArgs, ConfigError, KismetBridgeConfig, LogFormat, LoggingConfig};
pub use gpsd::{FixMode, GpsdError, GpsdSource, LocationFix};
pub use kismet::{KismetClient, KismetError};
pub use message::LocationUpdate;
pub use shutdown::ShutdownFlag;

/// Initialize tracing with the given configuration.
///
/// Supports two output formats:
/// - `LogFormat::Text` (default): Human-readable text format
/// - `LogFormat::Json`: Structured JSON format for log aggregation systems
pub fn init_tracing(config: &LoggingConfig) -> Result<(), ConfigError> {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format {
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(fmt::layer())
                .with(filter)
                .try_init()
                .map_err(|e| ConfigError::Logging(e.to_string()))?;
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(fmt::layer().json())
                .with(filter)
                .try_init()
                .map_err(|e| ConfigError::Logging(e.to_string()))?;
        }
    }

    Ok(())
}
