//! Playback, app and power data model
//!
//! These types form the JSON payloads the bridge publishes. Every field of
//! [`PlaybackSnapshot`] is absent-capable: a device that is off, between
//! apps, or mid-reconnect reports `null` rather than stale data.

use serde::{Deserialize, Serialize};

/// Kind of media currently loaded on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaKind {
    Unknown,
    Video,
    Music,
    Tv,
}

/// Transport state of the current playback session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportState {
    Idle,
    Loading,
    Paused,
    Playing,
    Seeking,
    Stopped,
}

/// Repeat mode reported by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RepeatMode {
    Off,
    Track,
    All,
}

/// Shuffle mode reported by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShuffleMode {
    Off,
    Albums,
    Songs,
}

/// Power state of the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerState {
    On,
    Off,
}

/// One installed application, as published on the apps topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppEntry {
    /// Human-readable application name
    pub name: String,
    /// Bundle identifier used for app launch commands
    pub id: String,
}

impl AppEntry {
    pub fn new(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
        }
    }
}

/// Snapshot of the device's playback state, published on the state topic.
///
/// Fields that the device cannot report at the moment serialize as JSON
/// `null`, so subscribers always see the full field set.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlaybackSnapshot {
    pub media_type: Option<MediaKind>,
    pub device_state: Option<TransportState>,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub genre: Option<String>,
    /// Playback position in seconds
    pub position: Option<u64>,
    /// Total media length in seconds
    pub total_time: Option<u64>,
    pub repeat: Option<RepeatMode>,
    pub shuffle: Option<ShuffleMode>,
    /// Name of the foreground app
    pub app: Option<String>,
    /// Identifier of the foreground app
    pub app_id: Option<String>,
    pub power_state: Option<PowerState>,
}
