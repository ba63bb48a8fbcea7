//! `waypoint publish`: the publisher role.

use tokio::sync::mpsc;
use tracing::{info, warn};
use waypoint_common::WaypointError;
use waypoint_config::WaypointConfig;
use waypoint_live::{
    AuthToken, ChannelManager, FixedPermission, LocationPublisher, PermissionStatus,
};

use crate::input;

const POSITION_BUFFER: usize = 64;

pub async fn run(
    config: WaypointConfig,
    token: AuthToken,
    input: &str,
) -> Result<(), WaypointError> {
    let flush_timeout = config.channel.connect_timeout();
    let manager = ChannelManager::new(config.channel);
    let session = manager.open(token);
    let transport = session.wait_ready().await?;
    info!(%transport, "Connected; publishing positions");

    let (tx, rx) = mpsc::channel(POSITION_BUFFER);
    let reader = tokio::spawn(input::read_positions(input.to_string(), tx));

    let mut publisher = LocationPublisher::new(config.publisher);
    publisher
        .start(&session, &FixedPermission(PermissionStatus::Granted), rx)
        .await?;

    let interrupted = tokio::select! {
        _ = publisher.finished() => false,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted");
            publisher.stop();
            true
        }
    };

    if tokio::time::timeout(flush_timeout, session.flush()).await.is_err() {
        warn!("Timed out flushing queued positions");
    }
    manager.close(&session);

    if interrupted {
        reader.abort();
        println!("published {} positions", publisher.emitted());
        return Ok(());
    }
    let read = match reader.await {
        Ok(result) => result?,
        Err(e) => return Err(WaypointError::Other(format!("input reader failed: {e}"))),
    };
    println!("published {} of {} positions", publisher.emitted(), read);
    Ok(())
}
