//! Kismet meta-GPS bridge for gpsd.
//!
//! Streams position fixes from a local gpsd daemon to a Kismet server's
//! meta-GPS websocket endpoint until terminated.

use anyhow::Result;
use clap::Parser;

use kismet_bridge_gpsd::bridge::GpsBridge;
use kismet_bridge_gpsd::config::{BridgeArgs, KismetBridgeConfig};
use kismet_bridge_gpsd::shutdown::{self, ShutdownFlag};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments and resolve the effective configuration
    let args = BridgeArgs::parse();
    let config = KismetBridgeConfig::resolve(&args)?;

    kismet_bridge_gpsd::init_tracing(&config.logging)?;

    tracing::info!(
        kismet = %config.kismet.host,
        metagps = %config.kismet.metagps,
        gpsd = %config.gpsd.addr(),
        "Starting gpsd to Kismet bridge"
    );

    // Termination signals only trip the flag; the loop notices it at the
    // next cycle boundary and tears down both connections.
    let flag = ShutdownFlag::new();
    shutdown::listen_for_signals(flag.clone());

    GpsBridge::new(config, flag).run().await;

    Ok(())
}
