//! `waypoint watch`: the subscriber role.

use tracing::{info, warn};
use waypoint_common::{ChannelError, WaypointError};
use waypoint_config::WaypointConfig;
use waypoint_live::{
    AuthToken, ChannelManager, LocationSubscriber, PresenceIndicator, SubscriberEvent,
};

use crate::display;

pub async fn run(config: WaypointConfig, token: AuthToken) -> Result<(), WaypointError> {
    let reconnect = config.channel.reconnect.enabled;
    let manager = ChannelManager::new(config.channel);
    let session = manager.open(token);
    let mut subscriber = LocationSubscriber::new(&session, config.subscriber);
    let mut presence = PresenceIndicator::new(&session);
    subscriber.subscribe().await?;
    println!("{}", display::badge_line(presence.badge(), &presence.status()));

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let outcome = loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Interrupted");
                break Ok(());
            }
            badge = presence.changed() => match badge {
                Some(badge) => println!("{}", display::badge_line(badge, &presence.status())),
                None => break Ok(()),
            },
            event = subscriber.next_event() => match event {
                Some(SubscriberEvent::ConnectError { error }) if !reconnect => break Err(error),
                Some(SubscriberEvent::ConnectError { error }) => {
                    warn!(error = %error, "Connect failed; retrying");
                }
                Some(SubscriberEvent::Disconnected { reason, .. }) => {
                    print!("{}", display::traveler_table(subscriber.travelers()));
                    if !reconnect {
                        break Err(ChannelError::ConnectFailed(reason));
                    }
                }
                Some(SubscriberEvent::Connected { .. }) => {}
                Some(_) => print!("{}", display::traveler_table(subscriber.travelers())),
                None => break Ok(()),
            },
        }
    };

    manager.close(&session);
    outcome.map_err(WaypointError::from)
}
