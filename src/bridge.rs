//! The resilient streaming loop tying gpsd to Kismet.
//!
//! The outer loop owns both connections and restarts the whole cycle on any
//! failure; the inner loop pulls one fix, translates it, sends it, and waits
//! for the reply frame. Both loops check the shutdown flag at their
//! boundaries only, so an in-flight await always completes or fails before
//! cancellation takes effect.

use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::config::KismetBridgeConfig;
use crate::gpsd::{GpsdError, GpsdSource};
use crate::kismet::{KismetClient, KismetError};
use crate::message::LocationUpdate;
use crate::shutdown::ShutdownFlag;

/// Pause between reconnect attempts after a failed cycle.
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Errors that can end one streaming cycle.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error(transparent)]
    Gpsd(#[from] GpsdError),
    #[error(transparent)]
    Kismet(#[from] KismetError),
}

/// The gpsd-to-Kismet bridge.
pub struct GpsBridge {
    config: KismetBridgeConfig,
    shutdown: ShutdownFlag,
}

impl GpsBridge {
    pub fn new(config: KismetBridgeConfig, shutdown: ShutdownFlag) -> Self {
        Self { config, shutdown }
    }

    /// Run until the shutdown flag is set.
    ///
    /// Every failure inside a cycle is classified, logged, and converted
    /// into a reconnect attempt; nothing propagates past this loop. Even
    /// authorization and unknown-name rejections are retried.
    pub async fn run(self) {
        let endpoint = self.config.kismet.endpoint_url();

        while !self.shutdown.is_set() {
            if let Err(e) = self.stream_once(&endpoint).await {
                log_cycle_failure(&e);
                if self.shutdown.is_set() {
                    break;
                }
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        }

        info!("Exiting");
    }

    /// One full connect-and-stream cycle.
    ///
    /// Both connections are released on every exit path: a failed Kismet
    /// handshake still closes the already-open gpsd connection, and a failure
    /// inside the streaming loop closes both.
    async fn stream_once(&self, endpoint: &str) -> Result<(), BridgeError> {
        let gpsd_addr = self.config.gpsd.addr();

        info!(addr = %gpsd_addr, "Connecting to gpsd");
        let mut source = GpsdSource::connect(&gpsd_addr).await?;

        info!(host = %self.config.kismet.host, "Connecting to Kismet");
        debug!(url = %endpoint, "Meta-GPS endpoint");
        let mut client = match KismetClient::connect(endpoint).await {
            Ok(client) => client,
            Err(e) => {
                source.close().await;
                return Err(e.into());
            }
        };

        info!("Sending location updates");
        let result = self.pump(&mut source, &mut client).await;

        client.close().await;
        source.close().await;
        result
    }

    /// The per-cycle poll/translate/send/ack loop.
    async fn pump(
        &self,
        source: &mut GpsdSource,
        client: &mut KismetClient,
    ) -> Result<(), BridgeError> {
        let interval = Duration::from_secs(self.config.kismet.update_interval_secs);

        while !self.shutdown.is_set() {
            let fix = source.next_fix().await?;
            let update = LocationUpdate::from_fix(&fix);
            debug!(?update, "Sending update");

            client.send(&update).await?;
            client.await_ack().await?;

            tokio::time::sleep(interval).await;
        }

        Ok(())
    }
}

/// Map each failure cause onto its operator-facing log line.
fn log_cycle_failure(err: &BridgeError) {
    match err {
        BridgeError::Kismet(KismetError::Refused(_)) => {
            error!("Failed to connect; check Kismet is running, or host address is valid (host:port)");
        }
        BridgeError::Kismet(KismetError::NotFound) => {
            error!(
                "Kismet failed to find the meta GPS name; check it matches the data source's metagps option"
            );
        }
        BridgeError::Kismet(KismetError::Unauthorized) => {
            error!("Kismet rejected the API key; check the key is valid, and has admin or WEBGPS role");
        }
        BridgeError::Kismet(KismetError::Rejected { status }) => {
            error!(status, "Kismet rejected the websocket handshake");
        }
        BridgeError::Kismet(KismetError::Closed) => {
            warn!("Connection to Kismet closed");
        }
        BridgeError::Kismet(e) => {
            error!(error = %e, "Kismet websocket failure");
        }
        BridgeError::Gpsd(GpsdError::Connect { .. }) => {
            error!("Failed to connect to gpsd; check it is running and reachable");
        }
        BridgeError::Gpsd(e) => {
            warn!(error = %e, "Lost the gpsd stream");
        }
    }
}
