//! Broker connection supervisor
//!
//! Owns the single broker link: connect-with-retry, the two command
//! subscriptions, the retained availability marker with its last-will
//! counterpart, and the hand-off of inbound messages to the dispatcher.
//!
//! The state machine is Disconnected -> Connecting -> Connected, falling
//! back to Connecting on any transport error while the supervisor has not
//! been stopped. `rumqttc` re-dials on the next poll, so "retry" here means
//! an interruptible delay before polling again.

use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{
    AsyncClient, ConnectReturnCode, Event, EventLoop, LastWill, MqttOptions, Packet, Publish, QoS,
};
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::BusError;
use crate::message::InboundMessage;
use crate::topics::Topics;

const KEEP_ALIVE: Duration = Duration::from_secs(60);
const REQUEST_CHANNEL_CAPACITY: usize = 16;
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Map a configured QoS level to the protocol enum.
pub fn qos_from_level(level: u8) -> Option<QoS> {
    match level {
        0 => Some(QoS::AtMostOnce),
        1 => Some(QoS::AtLeastOnce),
        2 => Some(QoS::ExactlyOnce),
        _ => None,
    }
}

/// Connection parameters for the broker link.
#[derive(Debug, Clone)]
pub struct BusConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Client identifier presented to the broker
    pub client_id: String,
    /// Quality-of-service level (0, 1 or 2) for every publish and subscribe
    pub qos: u8,
    /// Delay between reconnection attempts
    pub reconnect_delay: Duration,
}

/// Anything the scheduler-side components can publish through.
///
/// Abstracting the publish call keeps the dispatcher and the periodic
/// publishers testable without a broker.
#[async_trait]
pub trait MessagePublisher: Send + Sync {
    /// Fire-and-forget publish. Never fails from the caller's perspective:
    /// a missing connection or a transport error is logged and swallowed.
    async fn publish(&self, topic: &str, payload: String, retain: bool);
}

/// Supervises one broker connection for the lifetime of the process.
pub struct BusSupervisor {
    client: AsyncClient,
    qos: QoS,
    connected: watch::Receiver<bool>,
    stop: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl BusSupervisor {
    /// Build the client and spawn the event-loop task. The task connects,
    /// subscribes and publishes availability on its own; use
    /// [`BusSupervisor::wait_connected`] to await the first connection.
    pub fn start(
        config: BusConfig,
        topics: Topics,
        inbound: mpsc::UnboundedSender<InboundMessage>,
    ) -> Result<Self, BusError> {
        let qos = qos_from_level(config.qos).ok_or(BusError::InvalidQos(config.qos))?;

        let mut options = MqttOptions::new(&config.client_id, &config.host, config.port);
        options.set_credentials(&config.username, &config.password);
        options.set_keep_alive(KEEP_ALIVE);
        options.set_last_will(LastWill::new(&topics.availability, "offline", qos, true));

        let (client, event_loop) = AsyncClient::new(options, REQUEST_CHANNEL_CAPACITY);
        let (connected_tx, connected_rx) = watch::channel(false);
        let (stop_tx, stop_rx) = watch::channel(false);

        let task = tokio::spawn(run_event_loop(EventLoopContext {
            broker: format!("{}:{}", config.host, config.port),
            event_loop,
            client: client.clone(),
            topics,
            qos,
            inbound,
            connected: connected_tx,
            stop: stop_rx,
            reconnect_delay: config.reconnect_delay,
        }));

        Ok(Self {
            client,
            qos,
            connected: connected_rx,
            stop: stop_tx,
            task: Mutex::new(Some(task)),
        })
    }

    /// Whether the broker link is currently up.
    pub fn is_connected(&self) -> bool {
        *self.connected.borrow()
    }

    /// Wait for the first successful connection. Returns
    /// [`BusError::ShutdownRequested`] if the shutdown signal fires first,
    /// which makes the initial connection a fatal startup failure.
    pub async fn wait_connected(
        &self,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), BusError> {
        let mut connected = self.connected.clone();
        loop {
            if *connected.borrow() {
                return Ok(());
            }
            if *shutdown.borrow() {
                return Err(BusError::ShutdownRequested);
            }
            tokio::select! {
                changed = connected.changed() => {
                    if changed.is_err() {
                        // Supervisor task is gone; nothing to wait for.
                        return Err(BusError::ShutdownRequested);
                    }
                }
                changed = shutdown.changed() => {
                    // A dropped shutdown sender means the runtime is gone;
                    // treat it as a shutdown rather than spinning.
                    if changed.is_err() {
                        return Err(BusError::ShutdownRequested);
                    }
                }
            }
        }
    }

    /// Stop the event-loop task and disconnect from the broker.
    pub async fn shutdown(&self) {
        let _ = self.stop.send(true);
        if let Err(error) = self.client.disconnect().await {
            debug!(%error, "broker disconnect request failed");
        }
        if let Some(task) = self.task.lock().await.take() {
            match tokio::time::timeout(SHUTDOWN_GRACE, task).await {
                Ok(Ok(())) => info!("bus supervisor shut down cleanly"),
                Ok(Err(error)) if !error.is_cancelled() => {
                    warn!(%error, "bus supervisor task ended with error");
                }
                Ok(Err(_)) => {}
                Err(_) => warn!("bus supervisor did not stop within the grace period"),
            }
        }
    }
}

#[async_trait]
impl MessagePublisher for BusSupervisor {
    async fn publish(&self, topic: &str, payload: String, retain: bool) {
        if !self.is_connected() {
            warn!(topic, "not connected to broker, skipping publish");
            return;
        }
        match self.client.publish(topic, self.qos, retain, payload).await {
            Ok(()) => debug!(topic, retain, "published"),
            Err(error) => error!(topic, %error, "publish failed"),
        }
    }
}

struct EventLoopContext {
    broker: String,
    event_loop: EventLoop,
    client: AsyncClient,
    topics: Topics,
    qos: QoS,
    inbound: mpsc::UnboundedSender<InboundMessage>,
    connected: watch::Sender<bool>,
    stop: watch::Receiver<bool>,
    reconnect_delay: Duration,
}

async fn run_event_loop(mut ctx: EventLoopContext) {
    info!(broker = %ctx.broker, "bus supervisor started");

    loop {
        tokio::select! {
            changed = ctx.stop.changed() => {
                if changed.is_err() || *ctx.stop.borrow() {
                    break;
                }
            }
            event = ctx.event_loop.poll() => match event {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    if ack.code == ConnectReturnCode::Success {
                        on_connected(&mut ctx).await;
                    } else {
                        warn!(code = ?ack.code, "broker refused connection");
                    }
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => on_publish(&ctx, publish),
                Ok(Event::Incoming(Packet::Disconnect)) => {
                    let _ = ctx.connected.send(false);
                    warn!("disconnected by broker");
                }
                Ok(_) => {}
                Err(error) => {
                    let was_connected = *ctx.connected.borrow();
                    let _ = ctx.connected.send(false);
                    if was_connected {
                        warn!(%error, "broker connection lost");
                    } else {
                        error!(%error, "broker connection failed");
                    }
                    info!(
                        delay_secs = ctx.reconnect_delay.as_secs_f64(),
                        "retrying broker connection"
                    );
                    if !sleep_interruptible(ctx.reconnect_delay, &mut ctx.stop).await {
                        break;
                    }
                }
            }
        }
    }

    let _ = ctx.connected.send(false);
    info!("bus supervisor stopped");
}

/// Connected (or reconnected): restore subscriptions and announce presence.
async fn on_connected(ctx: &mut EventLoopContext) {
    info!(broker = %ctx.broker, "connected to broker");
    let _ = ctx.connected.send(true);

    for topic in [&ctx.topics.set, &ctx.topics.get] {
        if let Err(error) = ctx.client.subscribe(topic, ctx.qos).await {
            error!(topic, %error, "subscribe failed");
        } else {
            info!(topic, "subscribed");
        }
    }

    if let Err(error) = ctx
        .client
        .publish(&ctx.topics.availability, ctx.qos, true, "online")
        .await
    {
        error!(%error, "failed to publish availability");
    }
}

/// Hand an inbound message to the dispatcher queue. Runs on the event-loop
/// task and must not block: the queue is unbounded and a closed queue (the
/// dispatcher is shutting down) drops the message with a log line.
fn on_publish(ctx: &EventLoopContext, publish: Publish) {
    if publish.topic != ctx.topics.set && publish.topic != ctx.topics.get {
        debug!(topic = %publish.topic, "message on unexpected topic, ignoring");
        return;
    }

    let message = InboundMessage::new(
        publish.topic,
        String::from_utf8_lossy(&publish.payload).into_owned(),
    );
    debug!(topic = %message.topic, "inbound message queued");
    if ctx.inbound.send(message).is_err() {
        warn!("dispatcher queue closed, dropping inbound message");
    }
}

/// Sleep that is cut short by the stop signal. Returns `false` when the
/// sleep was interrupted (or the signal sender is gone).
pub async fn sleep_interruptible(delay: Duration, stop: &mut watch::Receiver<bool>) -> bool {
    if *stop.borrow() {
        return false;
    }
    let sleep = tokio::time::sleep(delay);
    tokio::pin!(sleep);
    loop {
        tokio::select! {
            () = &mut sleep => return true,
            changed = stop.changed() => {
                if changed.is_err() || *stop.borrow() {
                    return false;
                }
            }
        }
    }
}
