//! Inbound message dispatch.
//!
//! Drains the queue fed by the broker event loop and processes messages
//! strictly in arrival order. Because the dispatcher awaits each command to
//! completion before taking the next message, at most one command is ever
//! in flight against the device.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use tvbridge_mqtt::{InboundMessage, MessagePublisher, Topics};

use crate::command::{Command, GetRequest};
use crate::executor::Executor;
use crate::publisher;
use crate::shutdown::Shutdown;
use crate::supervisor::DeviceLink;

pub struct Dispatcher<P> {
    queue: mpsc::UnboundedReceiver<InboundMessage>,
    bus: Arc<P>,
    topics: Topics,
    executor: Executor,
    link: DeviceLink,
    shutdown: Shutdown,
}

impl<P: MessagePublisher> Dispatcher<P> {
    pub fn new(
        queue: mpsc::UnboundedReceiver<InboundMessage>,
        bus: Arc<P>,
        topics: Topics,
        executor: Executor,
        link: DeviceLink,
        shutdown: Shutdown,
    ) -> Self {
        Self {
            queue,
            bus,
            topics,
            executor,
            link,
            shutdown,
        }
    }

    /// Process messages until shutdown or until the queue closes.
    pub async fn run(mut self) {
        info!("command dispatcher started");
        loop {
            tokio::select! {
                () = self.shutdown.wait() => break,
                message = self.queue.recv() => match message {
                    Some(message) => self.handle(message).await,
                    None => {
                        debug!("inbound queue closed");
                        break;
                    }
                },
            }
        }
        info!("command dispatcher stopped");
    }

    async fn handle(&self, message: InboundMessage) {
        if message.topic == self.topics.set {
            match serde_json::from_str::<Command>(&message.payload) {
                Ok(command) => self.executor.execute(command).await,
                Err(error) => warn!(
                    %error,
                    payload = %message.payload,
                    "undecodable command payload, dropping"
                ),
            }
        } else if message.topic == self.topics.get {
            match serde_json::from_str::<GetRequest>(&message.payload) {
                Ok(request) => {
                    info!(kind = ?request.kind, "on-demand fetch requested");
                    if request.wants_state() {
                        publisher::publish_state(self.bus.as_ref(), &self.link, &self.topics).await;
                    }
                    if request.wants_apps() {
                        publisher::publish_apps(self.bus.as_ref(), &self.link, &self.topics).await;
                    }
                }
                Err(error) => warn!(%error, "undecodable fetch request, dropping"),
            }
        } else {
            debug!(topic = %message.topic, "message on unhandled topic");
        }
    }
}
