//! Device interface for the tvbridge daemon
//!
//! This crate defines the seam between the bridge runtime and the controlled
//! set-top device: traits for discovery and an established session, the
//! playback/app/power data model published over MQTT, and credential parsing.
//! The device wire protocol itself (pairing, command framing) lives behind
//! the [`DeviceScanner`] and [`DeviceHandle`] traits and is supplied by a
//! backend implementation.
//!
//! The [`loopback`] module provides an in-memory backend with an action
//! journal. It backs the test suites of every tvbridge crate and serves as
//! the daemon's stand-in backend until a real protocol client is wired in.

mod client;
mod credential;
mod error;
mod model;

pub mod loopback;

pub use client::{Button, DeviceHandle, DeviceScanner, DiscoveredDevice, PowerCommand};
pub use credential::{Credential, Protocol};
pub use error::{DeviceError, Result};
pub use model::{
    AppEntry, MediaKind, PlaybackSnapshot, PowerState, RepeatMode, ShuffleMode, TransportState,
};
