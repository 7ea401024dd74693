//! Bridge assembly and lifecycle.
//!
//! Startup is strictly ordered: broker first, then the device, then the
//! worker tasks. Either initial connection failing is fatal; after that the
//! bridge runs until shutdown is requested, then tears down in reverse
//! order and leaves a retained `offline` marker behind.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use tvbridge_device::DeviceScanner;
use tvbridge_mqtt::{BusConfig, BusSupervisor, MessagePublisher, Topics};

use crate::config::BridgeConfig;
use crate::dispatcher::Dispatcher;
use crate::error::BridgeError;
use crate::executor::Executor;
use crate::publisher;
use crate::shutdown::Shutdown;
use crate::supervisor::{DeviceLink, DeviceSupervisor};

/// How long worker tasks get to finish after shutdown is requested.
const JOIN_GRACE: Duration = Duration::from_secs(5);

/// The assembled bridge, ready to run.
pub struct Bridge<S> {
    config: BridgeConfig,
    scanner: S,
}

impl<S: DeviceScanner> Bridge<S> {
    pub fn new(config: BridgeConfig, scanner: S) -> Self {
        Self { config, scanner }
    }

    /// Run until shutdown. Returns an error only when one of the initial
    /// connections could not be established.
    pub async fn run(self, shutdown: Shutdown) -> Result<(), BridgeError> {
        let topics = Topics::new(&self.config.base_topic);
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();

        let bus_config = BusConfig {
            host: self.config.mqtt_host.clone(),
            port: self.config.mqtt_port,
            username: self.config.mqtt_user.clone(),
            password: self.config.mqtt_password.clone(),
            client_id: format!("tvbridge_{}", self.config.device_id.replace(':', "")),
            qos: self.config.mqtt_qos,
            reconnect_delay: self.config.mqtt_reconnect_delay,
        };
        let bus = Arc::new(BusSupervisor::start(bus_config, topics.clone(), inbound_tx)?);

        if bus.wait_connected(shutdown.watch()).await.is_err() {
            error!("shutdown before the broker connection came up");
            bus.shutdown().await;
            return Err(BridgeError::BrokerUnavailable);
        }

        let link = DeviceLink::new();
        let supervisor = DeviceSupervisor::new(
            self.scanner,
            &self.config,
            link.clone(),
            shutdown.clone(),
        );
        if supervisor.connect_with_retry().await.is_none() {
            teardown(bus.as_ref(), &link, &topics).await;
            bus.shutdown().await;
            return Err(BridgeError::DeviceUnavailable);
        }

        let dispatcher = Dispatcher::new(
            inbound_rx,
            Arc::clone(&bus),
            topics.clone(),
            Executor::new(link.clone()),
            link.clone(),
            shutdown.clone(),
        );
        let tasks = vec![
            tokio::spawn(dispatcher.run()),
            tokio::spawn(publisher::run_state_publisher(
                Arc::clone(&bus),
                link.clone(),
                topics.clone(),
                self.config.state_interval,
                shutdown.clone(),
            )),
            tokio::spawn(publisher::run_apps_publisher(
                Arc::clone(&bus),
                link.clone(),
                topics.clone(),
                self.config.apps_interval,
                shutdown.clone(),
            )),
        ];
        info!("bridge is running");

        shutdown.wait().await;
        info!("shutting down");
        join_with_grace(tasks, JOIN_GRACE).await;

        teardown(bus.as_ref(), &link, &topics).await;
        bus.shutdown().await;
        info!("shutdown complete");
        Ok(())
    }
}

/// Final teardown after the worker tasks are gone: announce the retained
/// `offline` marker while the broker link is still up, then close whatever
/// device session remains.
async fn teardown<P: MessagePublisher>(bus: &P, link: &DeviceLink, topics: &Topics) {
    bus.publish(&topics.availability, "offline".to_string(), true)
        .await;
    if let Some(device) = link.clear().await {
        device.close().await;
        info!("device session closed");
    }
}

/// Join worker tasks within a shared grace period, aborting stragglers.
async fn join_with_grace(tasks: Vec<JoinHandle<()>>, grace: Duration) {
    let deadline = tokio::time::Instant::now() + grace;
    for mut task in tasks {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        match tokio::time::timeout(remaining, &mut task).await {
            Ok(Ok(())) => {}
            Ok(Err(join_error)) if !join_error.is_cancelled() => {
                warn!(%join_error, "worker task ended with error");
            }
            Ok(Err(_)) => {}
            Err(_) => {
                warn!("worker task did not stop within the grace period, aborting");
                task.abort();
            }
        }
    }
}
