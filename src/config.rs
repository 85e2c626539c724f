//! Configuration for the Kismet bridge.
//!
//! Settings come from CLI flags, from a JSON5 configuration file, or both;
//! flags win over file values.

use std::path::{Path, PathBuf};

use clap::Parser;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] json5::Error),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Missing required argument: {0}")]
    MissingArgument(&'static str),
    #[error("Failed to initialize logging: {0}")]
    Logging(String),
}

/// CLI arguments.
#[derive(Parser, Debug, Clone)]
#[command(about = "Kismet meta-GPS bridge for gpsd", version)]
pub struct BridgeArgs {
    /// Path to a JSON5 configuration file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Address of the Kismet server (host:port).
    #[arg(long = "connect", value_name = "HOST:PORT")]
    pub connect: Option<String>,

    /// Meta GPS name; should match a data source's metagps option.
    #[arg(long)]
    pub metagps: Option<String>,

    /// Kismet API key; requires admin or WEBGPS (custom) role.
    #[arg(long)]
    pub apikey: Option<String>,

    /// Use a secure (wss) connection.
    #[arg(long)]
    pub ssl: bool,

    /// Enable debug output (shorthand for --log-level debug).
    #[arg(long)]
    pub debug: bool,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,
}

/// Complete bridge configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KismetBridgeConfig {
    /// Kismet endpoint settings.
    pub kismet: KismetConfig,

    /// gpsd connection settings.
    #[serde(default)]
    pub gpsd: GpsdConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Kismet endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KismetConfig {
    /// Address of the Kismet server (host:port).
    pub host: String,

    /// Meta GPS name; must match a data source's metagps option.
    pub metagps: String,

    /// API key with admin or WEBGPS role.
    pub apikey: String,

    /// Use a TLS (wss) connection (default: false).
    #[serde(default)]
    pub ssl: bool,

    /// Seconds between location updates (default: 1).
    #[serde(default = "default_update_interval")]
    pub update_interval_secs: u64,
}

fn default_update_interval() -> u64 {
    1
}

impl KismetConfig {
    /// Build the meta-GPS websocket endpoint URL.
    pub fn endpoint_url(&self) -> String {
        let scheme = if self.ssl { "wss" } else { "ws" };
        format!(
            "{}://{}/gps/meta/{}/update.ws?KISMET={}",
            scheme, self.host, self.metagps, self.apikey
        )
    }
}

/// gpsd connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GpsdConfig {
    /// gpsd host (default: 127.0.0.1).
    #[serde(default = "default_gpsd_host")]
    pub host: String,

    /// gpsd port (default: 2947).
    #[serde(default = "default_gpsd_port")]
    pub port: u16,
}

fn default_gpsd_host() -> String {
    "127.0.0.1".to_string()
}

fn default_gpsd_port() -> u16 {
    2947
}

impl Default for GpsdConfig {
    fn default() -> Self {
        Self {
            host: default_gpsd_host(),
            port: default_gpsd_port(),
        }
    }
}

impl GpsdConfig {
    /// Dial address for the daemon.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text format (default).
    #[default]
    Text,
    /// Structured JSON format.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format: "text" or "json".
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

impl KismetBridgeConfig {
    /// Load configuration from a JSON5 file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: KismetBridgeConfig = json5::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve the effective configuration from CLI arguments.
    ///
    /// With `--config` the file supplies the base settings and the remaining
    /// flags override them; without it, `--connect`, `--metagps` and
    /// `--apikey` are required.
    pub fn resolve(args: &BridgeArgs) -> Result<Self, ConfigError> {
        let mut config = match &args.config {
            Some(path) => Self::load_from_file(path)?,
            None => Self {
                kismet: KismetConfig {
                    host: args
                        .connect
                        .clone()
                        .ok_or(ConfigError::MissingArgument("--connect"))?,
                    metagps: args
                        .metagps
                        .clone()
                        .ok_or(ConfigError::MissingArgument("--metagps"))?,
                    apikey: args
                        .apikey
                        .clone()
                        .ok_or(ConfigError::MissingArgument("--apikey"))?,
                    ssl: args.ssl,
                    update_interval_secs: default_update_interval(),
                },
                gpsd: GpsdConfig::default(),
                logging: LoggingConfig::default(),
            },
        };

        if let Some(host) = &args.connect {
            config.kismet.host = host.clone();
        }
        if let Some(metagps) = &args.metagps {
            config.kismet.metagps = metagps.clone();
        }
        if let Some(apikey) = &args.apikey {
            config.kismet.apikey = apikey.clone();
        }
        if args.ssl {
            config.kismet.ssl = true;
        }
        if let Some(level) = &args.log_level {
            config.logging.level = level.clone();
        } else if args.debug {
            config.logging.level = "debug".to_string();
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.kismet.host.is_empty() {
            return Err(ConfigError::Validation(
                "kismet.host must not be empty".to_string(),
            ));
        }
        if self.kismet.metagps.is_empty() {
            return Err(ConfigError::Validation(
                "kismet.metagps must not be empty".to_string(),
            ));
        }
        if self.kismet.apikey.is_empty() {
            return Err(ConfigError::Validation(
                "kismet.apikey must not be empty".to_string(),
            ));
        }
        if self.kismet.update_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "update_interval_secs must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_args() -> BridgeArgs {
        BridgeArgs {
            config: None,
            connect: None,
            metagps: None,
            apikey: None,
            ssl: false,
            debug: false,
            log_level: None,
        }
    }

    #[test]
    fn test_parse_minimal_config() {
        let json = r#"{
            kismet: { host: "localhost:2501", metagps: "drone1", apikey: "secret" }
        }"#;

        let config: KismetBridgeConfig = json5::from_str(json).unwrap();
        config.validate().unwrap();

        assert!(!config.kismet.ssl);
        assert_eq!(config.kismet.update_interval_secs, 1);
        assert_eq!(config.gpsd.addr(), "127.0.0.1:2947");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_parse_full_config() {
        let json = r#"{
            kismet: {
                host: "kismet.example.org:2501",
                metagps: "rover",
                apikey: "secret",
                ssl: true,
                update_interval_secs: 5,
            },
            gpsd: { host: "10.0.0.2", port: 12947 },
            logging: { level: "debug", format: "json" },
        }"#;

        let config: KismetBridgeConfig = json5::from_str(json).unwrap();
        config.validate().unwrap();

        assert!(config.kismet.ssl);
        assert_eq!(config.kismet.update_interval_secs, 5);
        assert_eq!(config.gpsd.addr(), "10.0.0.2:12947");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_validate_zero_interval() {
        let json = r#"{
            kismet: { host: "h:1", metagps: "m", apikey: "k", update_interval_secs: 0 }
        }"#;

        let config: KismetBridgeConfig = json5::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_empty_apikey() {
        let json = r#"{
            kismet: { host: "h:1", metagps: "m", apikey: "" }
        }"#;

        let config: KismetBridgeConfig = json5::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_endpoint_url_plain() {
        let config = KismetConfig {
            host: "localhost:2501".to_string(),
            metagps: "drone1".to_string(),
            apikey: "secret".to_string(),
            ssl: false,
            update_interval_secs: 1,
        };

        assert_eq!(
            config.endpoint_url(),
            "ws://localhost:2501/gps/meta/drone1/update.ws?KISMET=secret"
        );
    }

    #[test]
    fn test_endpoint_url_tls() {
        let config = KismetConfig {
            host: "kismet.example.org:2501".to_string(),
            metagps: "rover".to_string(),
            apikey: "key".to_string(),
            ssl: true,
            update_interval_secs: 1,
        };

        assert_eq!(
            config.endpoint_url(),
            "wss://kismet.example.org:2501/gps/meta/rover/update.ws?KISMET=key"
        );
    }

    #[test]
    fn test_resolve_from_flags() {
        let args = BridgeArgs {
            connect: Some("localhost:2501".to_string()),
            metagps: Some("drone1".to_string()),
            apikey: Some("secret".to_string()),
            ssl: true,
            ..no_args()
        };

        let config = KismetBridgeConfig::resolve(&args).unwrap();

        assert_eq!(config.kismet.host, "localhost:2501");
        assert_eq!(config.kismet.metagps, "drone1");
        assert!(config.kismet.ssl);
        assert_eq!(config.gpsd.addr(), "127.0.0.1:2947");
    }

    #[test]
    fn test_resolve_requires_connect() {
        let args = BridgeArgs {
            metagps: Some("drone1".to_string()),
            apikey: Some("secret".to_string()),
            ..no_args()
        };

        assert!(matches!(
            KismetBridgeConfig::resolve(&args),
            Err(ConfigError::MissingArgument("--connect"))
        ));
    }

    #[test]
    fn test_log_level_flag_overrides() {
        let args = BridgeArgs {
            connect: Some("localhost:2501".to_string()),
            metagps: Some("drone1".to_string()),
            apikey: Some("secret".to_string()),
            log_level: Some("trace".to_string()),
            ..no_args()
        };

        let config = KismetBridgeConfig::resolve(&args).unwrap();
        assert_eq!(config.logging.level, "trace");
    }

    #[test]
    fn test_debug_flag_raises_verbosity() {
        let args = BridgeArgs {
            connect: Some("localhost:2501".to_string()),
            metagps: Some("drone1".to_string()),
            apikey: Some("secret".to_string()),
            debug: true,
            ..no_args()
        };

        let config = KismetBridgeConfig::resolve(&args).unwrap();
        assert_eq!(config.logging.level, "debug");

        // An explicit --log-level wins over --debug.
        let args = BridgeArgs {
            log_level: Some("warn".to_string()),
            ..args
        };
        let config = KismetBridgeConfig::resolve(&args).unwrap();
        assert_eq!(config.logging.level, "warn");
    }
}
