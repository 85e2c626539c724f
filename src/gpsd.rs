//! Client for the gpsd JSON streaming protocol.
//!
//! gpsd speaks newline-delimited JSON over TCP. After connecting we enable
//! watch mode and then filter the report stream down to TPV
//! (time-position-velocity) reports; everything else (SKY, VERSION, DEVICES,
//! WATCH, ...) is discarded without buffering.

use serde::Deserialize;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tracing::debug;

/// Command that switches gpsd into JSON streaming mode.
const WATCH_ENABLE: &str = "?WATCH={\"enable\":true,\"json\":true}\n";

/// Errors from the gpsd connection.
#[derive(Debug, Error)]
pub enum GpsdError {
    /// The daemon refused or dropped the connection attempt.
    #[error("Failed to connect to gpsd at {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// The stream failed mid-read.
    #[error("Failed to read from gpsd: {0}")]
    Read(std::io::Error),

    /// The daemon closed the connection.
    #[error("gpsd closed the connection")]
    Closed,
}

/// Position fix quality reported by gpsd.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixMode {
    NoFix,
    Fix2d,
    Fix3d,
}

impl From<u8> for FixMode {
    fn from(mode: u8) -> Self {
        match mode {
            2 => FixMode::Fix2d,
            3 => FixMode::Fix3d,
            _ => FixMode::NoFix,
        }
    }
}

/// A single usable position fix.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationFix {
    pub latitude: f64,
    pub longitude: f64,
    pub mode: FixMode,
    /// Altitude in meters, when gpsd reports one.
    pub altitude_m: Option<f64>,
    /// Ground speed in meters per second.
    pub speed_mps: f64,
}

/// One report from the gpsd stream, keyed by its `class` field.
#[derive(Debug, Deserialize)]
#[serde(tag = "class")]
enum GpsdReport {
    #[serde(rename = "TPV")]
    Tpv(TpvReport),

    /// SKY, VERSION, DEVICES, WATCH and friends.
    #[serde(other)]
    Other,
}

/// The TPV report fields the bridge cares about.
#[derive(Debug, Clone, Deserialize)]
struct TpvReport {
    #[serde(default)]
    mode: u8,
    lat: Option<f64>,
    lon: Option<f64>,
    alt: Option<f64>,
    speed: Option<f64>,
}

impl TpvReport {
    /// A TPV report only becomes a fix once position and speed are present;
    /// gpsd emits sparse TPV reports while it is still acquiring.
    fn into_fix(self) -> Option<LocationFix> {
        let (Some(lat), Some(lon), Some(speed)) = (self.lat, self.lon, self.speed) else {
            return None;
        };

        Some(LocationFix {
            latitude: lat,
            longitude: lon,
            mode: FixMode::from(self.mode),
            altitude_m: self.alt,
            speed_mps: speed,
        })
    }
}

/// A live watch-mode connection to gpsd.
pub struct GpsdSource {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl GpsdSource {
    /// Connect to the daemon and enable JSON watch mode.
    pub async fn connect(addr: &str) -> Result<Self, GpsdError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| GpsdError::Connect {
                addr: addr.to_string(),
                source: e,
            })?;

        let (reader, mut writer) = stream.into_split();

        writer
            .write_all(WATCH_ENABLE.as_bytes())
            .await
            .map_err(|e| GpsdError::Connect {
                addr: addr.to_string(),
                source: e,
            })?;

        Ok(Self {
            lines: BufReader::new(reader).lines(),
            writer,
        })
    }

    /// Block until the next usable TPV fix, discarding every other report.
    pub async fn next_fix(&mut self) -> Result<LocationFix, GpsdError> {
        loop {
            let line = self
                .lines
                .next_line()
                .await
                .map_err(GpsdError::Read)?
                .ok_or(GpsdError::Closed)?;

            match serde_json::from_str::<GpsdReport>(&line) {
                Ok(GpsdReport::Tpv(tpv)) => {
                    if let Some(fix) = tpv.into_fix() {
                        return Ok(fix);
                    }
                    debug!("Skipping incomplete TPV report");
                }
                Ok(GpsdReport::Other) => {}
                Err(e) => {
                    debug!(error = %e, line = %line, "Skipping unparseable gpsd report");
                }
            }
        }
    }

    /// Release the daemon connection.
    pub async fn close(mut self) {
        let _ = self.writer.shutdown().await;
    }
}
