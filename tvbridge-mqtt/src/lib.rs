//! Broker side of the tvbridge daemon
//!
//! This crate owns everything that touches the MQTT broker: the topic
//! layout under the configured base prefix, a connection supervisor that
//! keeps one broker link alive across disconnects, and the hand-off of
//! inbound command messages from the broker event loop into the
//! dispatcher's queue.
//!
//! The supervisor runs the `rumqttc` event loop on its own task. That task
//! is the only code that ever blocks on broker I/O; everything it learns is
//! communicated through a `watch` channel (connection state) and an
//! unbounded `mpsc` channel (inbound messages), so producers never touch
//! dispatcher-owned state directly.

mod error;
mod message;
mod supervisor;
mod topics;

pub use error::BusError;
pub use message::InboundMessage;
pub use supervisor::{qos_from_level, BusConfig, BusSupervisor, MessagePublisher};
pub use topics::Topics;
