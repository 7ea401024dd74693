//! Periodic state and app-list publication.
//!
//! Two independent loops, each publishing once immediately and then on its
//! own interval. State snapshots are not retained; the app list is, so late
//! subscribers see the last known list without waiting a full cycle.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use tvbridge_mqtt::{MessagePublisher, Topics};

use crate::fetch;
use crate::shutdown::Shutdown;
use crate::supervisor::DeviceLink;

/// Fetch and publish one playback snapshot.
pub(crate) async fn publish_state<P: MessagePublisher>(bus: &P, link: &DeviceLink, topics: &Topics) {
    let snapshot = fetch::read_state(link).await;
    match serde_json::to_string(&snapshot) {
        Ok(payload) => bus.publish(&topics.state, payload, false).await,
        Err(error) => error!(%error, "failed to encode playback snapshot"),
    }
}

/// Fetch and publish the installed app list, retained.
pub(crate) async fn publish_apps<P: MessagePublisher>(bus: &P, link: &DeviceLink, topics: &Topics) {
    let apps = fetch::read_apps(link).await;
    match serde_json::to_string(&apps) {
        Ok(payload) => bus.publish(&topics.apps, payload, true).await,
        Err(error) => error!(%error, "failed to encode app list"),
    }
}

/// Publish the playback snapshot now and then every `interval` until
/// shutdown.
pub async fn run_state_publisher<P: MessagePublisher>(
    bus: Arc<P>,
    link: DeviceLink,
    topics: Topics,
    interval: Duration,
    shutdown: Shutdown,
) {
    info!(interval_secs = interval.as_secs(), "state publisher started");
    loop {
        publish_state(bus.as_ref(), &link, &topics).await;
        if !shutdown.sleep(interval).await {
            break;
        }
    }
    info!("state publisher stopped");
}

/// Publish the app list now and then every `interval` until shutdown.
pub async fn run_apps_publisher<P: MessagePublisher>(
    bus: Arc<P>,
    link: DeviceLink,
    topics: Topics,
    interval: Duration,
    shutdown: Shutdown,
) {
    info!(interval_secs = interval.as_secs(), "app list publisher started");
    loop {
        publish_apps(bus.as_ref(), &link, &topics).await;
        if !shutdown.sleep(interval).await {
            break;
        }
    }
    info!("app list publisher stopped");
}
