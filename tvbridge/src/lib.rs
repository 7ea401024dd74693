//! Bridge runtime between a network-controllable media device and an MQTT
//! broker.
//!
//! The runtime wires three long-lived activities onto one broker session:
//! a command dispatcher draining inbound messages in arrival order, and two
//! periodic publishers pushing playback state and the installed app list.
//! Device access goes through the traits in `tvbridge-device`; broker access
//! through `tvbridge-mqtt`.

pub mod command;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod executor;
pub mod fetch;
pub mod publisher;
pub mod runtime;
pub mod shutdown;
pub mod supervisor;

#[cfg(test)]
pub(crate) mod testutil;

pub use command::{Command, GetKind, GetRequest};
pub use config::BridgeConfig;
pub use error::BridgeError;
pub use runtime::Bridge;
pub use shutdown::Shutdown;
pub use supervisor::{DeviceLink, DeviceSupervisor};
