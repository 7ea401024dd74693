//! Fail-soft device reads.
//!
//! Snapshot fetching never propagates errors: an unreachable or confused
//! device yields the all-fields-absent snapshot or an empty app list, so the
//! publishers and the dispatcher always have something to publish.

use tracing::{debug, error};

use tvbridge_device::{AppEntry, PlaybackSnapshot};

use crate::supervisor::DeviceLink;

/// Current playback snapshot, or the empty default when no session exists
/// or the metadata fetch fails.
pub async fn read_state(link: &DeviceLink) -> PlaybackSnapshot {
    let Some(device) = link.current().await else {
        return PlaybackSnapshot::default();
    };

    let mut snapshot = match device.now_playing().await {
        Ok(snapshot) => snapshot,
        Err(error) => {
            error!(%error, "failed to fetch playback state");
            return PlaybackSnapshot::default();
        }
    };

    match device.current_app().await {
        Ok(Some(app)) => {
            snapshot.app = Some(app.name);
            snapshot.app_id = Some(app.id);
        }
        Ok(None) => {}
        Err(error) => debug!(%error, "failed to fetch foreground app"),
    }

    match device.power_state().await {
        Ok(power) => snapshot.power_state = power,
        Err(error) => debug!(%error, "failed to fetch power state"),
    }

    snapshot
}

/// Installed apps, or an empty list when no session exists or the device
/// cannot enumerate them.
pub async fn read_apps(link: &DeviceLink) -> Vec<AppEntry> {
    let Some(device) = link.current().await else {
        return Vec::new();
    };
    match device.app_list().await {
        Ok(apps) => apps,
        Err(error) => {
            error!(%error, "failed to fetch app list");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tvbridge_device::loopback::LoopbackDevice;
    use tvbridge_device::{PowerState, TransportState};

    async fn linked(device: Arc<LoopbackDevice>) -> DeviceLink {
        let link = DeviceLink::new();
        link.replace(device).await;
        link
    }

    #[tokio::test]
    async fn missing_session_yields_the_default_snapshot() {
        let link = DeviceLink::new();
        assert_eq!(read_state(&link).await, PlaybackSnapshot::default());
        assert!(read_apps(&link).await.is_empty());
    }

    #[tokio::test]
    async fn snapshot_carries_app_and_power_overlays() {
        let device = Arc::new(LoopbackDevice::new());
        device.set_snapshot(PlaybackSnapshot {
            device_state: Some(TransportState::Playing),
            title: Some("Some Film".to_string()),
            app: Some("Player".to_string()),
            app_id: Some("com.example.player".to_string()),
            power_state: Some(PowerState::On),
            ..Default::default()
        });
        let link = linked(device).await;

        let snapshot = read_state(&link).await;
        assert_eq!(snapshot.device_state, Some(TransportState::Playing));
        assert_eq!(snapshot.app.as_deref(), Some("Player"));
        assert_eq!(snapshot.app_id.as_deref(), Some("com.example.player"));
        assert_eq!(snapshot.power_state, Some(PowerState::On));
    }

    #[tokio::test]
    async fn metadata_failure_yields_the_default_snapshot() {
        let device = Arc::new(LoopbackDevice::new());
        device.set_snapshot(PlaybackSnapshot {
            title: Some("should not leak".to_string()),
            ..Default::default()
        });
        device.fail_now_playing(true);
        let link = linked(device).await;

        assert_eq!(read_state(&link).await, PlaybackSnapshot::default());
    }

    #[tokio::test]
    async fn app_list_failure_yields_an_empty_list() {
        let device = Arc::new(LoopbackDevice::new());
        device.disable_apps();
        let link = linked(device).await;

        assert!(read_apps(&link).await.is_empty());
    }
}
