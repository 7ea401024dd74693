//! Device session supervision.
//!
//! Holds the live device handle behind a shared slot and owns the
//! scan-then-connect retry loop used at startup. The slot can be swapped
//! wholesale, so a future reconnect path replaces the session without the
//! dispatcher or publishers noticing.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::{info, warn};

use tvbridge_device::{Credential, DeviceError, DeviceHandle, DeviceScanner};

use crate::config::BridgeConfig;
use crate::shutdown::Shutdown;

/// How long one discovery sweep may take.
pub const DISCOVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared slot for the current device session.
///
/// Readers take a cheap clone of the handle and keep using it even if the
/// slot changes underneath them; a stale handle fails its next call and the
/// caller falls back to its fail-soft path.
#[derive(Clone, Default)]
pub struct DeviceLink {
    inner: Arc<RwLock<Option<Arc<dyn DeviceHandle>>>>,
}

impl DeviceLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current session, if one is established.
    pub async fn current(&self) -> Option<Arc<dyn DeviceHandle>> {
        self.inner.read().await.clone()
    }

    /// Install a new session, replacing any previous one.
    pub async fn replace(&self, handle: Arc<dyn DeviceHandle>) {
        *self.inner.write().await = Some(handle);
    }

    /// Take the session out of the slot, leaving it empty.
    pub async fn clear(&self) -> Option<Arc<dyn DeviceHandle>> {
        self.inner.write().await.take()
    }
}

/// Scan-and-connect loop for one configured device.
pub struct DeviceSupervisor<S> {
    scanner: S,
    identifier: String,
    address: String,
    credential: Credential,
    reconnect_delay: Duration,
    link: DeviceLink,
    shutdown: Shutdown,
}

impl<S: DeviceScanner> DeviceSupervisor<S> {
    pub fn new(scanner: S, config: &BridgeConfig, link: DeviceLink, shutdown: Shutdown) -> Self {
        Self {
            scanner,
            identifier: config.device_id.clone(),
            address: config.device_address.clone(),
            credential: config.device_credentials.clone(),
            reconnect_delay: config.device_reconnect_delay,
            link,
            shutdown,
        }
    }

    /// Keep trying to establish a session until it succeeds or shutdown is
    /// requested. On success the session is installed in the link before
    /// being returned; on shutdown the link is left empty and `None` comes
    /// back.
    pub async fn connect_with_retry(&self) -> Option<Arc<dyn DeviceHandle>> {
        while !self.shutdown.is_shutdown() {
            info!(
                device = %self.identifier,
                address = %self.address,
                "connecting to device"
            );
            match self.try_connect().await {
                Ok(handle) => {
                    info!(model = handle.model(), "connected to device");
                    self.link.replace(Arc::clone(&handle)).await;
                    return Some(handle);
                }
                Err(error) => {
                    warn!(
                        %error,
                        delay_secs = self.reconnect_delay.as_secs_f64(),
                        "device connection failed, retrying"
                    );
                    if !self.shutdown.sleep(self.reconnect_delay).await {
                        break;
                    }
                }
            }
        }
        info!("shutdown requested before a device session was established");
        None
    }

    async fn try_connect(&self) -> tvbridge_device::Result<Arc<dyn DeviceHandle>> {
        let devices = self.scanner.scan(&self.identifier, DISCOVERY_TIMEOUT).await?;
        let device = devices
            .into_iter()
            .next()
            .ok_or_else(|| DeviceError::NotFound {
                identifier: self.identifier.clone(),
            })?;
        self.scanner.connect(&device, &self.credential).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tvbridge_device::loopback::LoopbackScanner;

    fn test_config() -> BridgeConfig {
        BridgeConfig::from_lookup(|key| {
            Some(
                match key {
                    "MQTT_HOST" => "127.0.0.1",
                    "MQTT_PORT" => "1883",
                    "MQTT_USER" => "u",
                    "MQTT_PASSWORD" => "p",
                    "MQTT_QOS" => "0",
                    "MQTT_BASE_TOPIC" => "test/tv",
                    "DEVICE_ID" => "aa:bb",
                    "DEVICE_CREDENTIALS" => "companion:secret",
                    "DEVICE_ADDRESS" => "10.0.0.9",
                    "STATE_UPDATE_INTERVAL" => "10",
                    "APPS_UPDATE_INTERVAL" => "300",
                    "MQTT_RECONNECT_DELAY" => "1",
                    "DEVICE_RECONNECT_DELAY" => "1",
                    _ => return None,
                }
                .to_string(),
            )
        })
        .unwrap()
    }

    fn supervisor(
        scanner: LoopbackScanner,
        shutdown: Shutdown,
    ) -> (DeviceSupervisor<LoopbackScanner>, DeviceLink) {
        let mut config = test_config();
        config.device_reconnect_delay = Duration::from_millis(5);
        let link = DeviceLink::new();
        (
            DeviceSupervisor::new(scanner, &config, link.clone(), shutdown),
            link,
        )
    }

    #[tokio::test]
    async fn connects_on_first_try() {
        let scanner = LoopbackScanner::single("aa:bb", "10.0.0.9");
        let (supervisor, link) = supervisor(scanner, Shutdown::new());

        let handle = supervisor.connect_with_retry().await;
        assert!(handle.is_some());
        assert!(link.current().await.is_some());
    }

    #[tokio::test]
    async fn retries_until_the_device_answers() {
        let scanner = LoopbackScanner::single("aa:bb", "10.0.0.9");
        scanner.fail_next_scans(2);
        let (supervisor, _) = supervisor(scanner, Shutdown::new());

        assert!(supervisor.connect_with_retry().await.is_some());
        assert_eq!(supervisor.scanner.scan_count(), 3);
    }

    #[tokio::test]
    async fn connect_failures_are_retried_too() {
        let scanner = LoopbackScanner::single("aa:bb", "10.0.0.9");
        scanner.fail_connect(true);
        let (supervisor, link) = supervisor(scanner, Shutdown::new());

        let lift_failure = async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            supervisor.scanner.fail_connect(false);
        };
        let (found, ()) = tokio::join!(supervisor.connect_with_retry(), lift_failure);

        assert!(found.is_some());
        assert!(supervisor.scanner.scan_count() >= 2);
        assert!(link.current().await.is_some());
    }

    #[tokio::test]
    async fn shutdown_stops_the_retry_loop() {
        let scanner = LoopbackScanner::new();
        let shutdown = Shutdown::new();
        let (supervisor, link) = supervisor(scanner, shutdown.clone());

        let attempt = tokio::spawn(async move { supervisor.connect_with_retry().await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        shutdown.request();

        let result = tokio::time::timeout(Duration::from_secs(1), attempt)
            .await
            .expect("retry loop did not stop")
            .expect("supervisor panicked");
        assert!(result.is_none());
        assert!(link.current().await.is_none());
    }

    #[tokio::test]
    async fn replace_and_clear_swap_the_slot() {
        let link = DeviceLink::new();
        assert!(link.current().await.is_none());

        let device: Arc<dyn DeviceHandle> =
            Arc::new(tvbridge_device::loopback::LoopbackDevice::new());
        link.replace(Arc::clone(&device)).await;
        assert!(link.current().await.is_some());

        assert!(link.clear().await.is_some());
        assert!(link.current().await.is_none());
    }
}
