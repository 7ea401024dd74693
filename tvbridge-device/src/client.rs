//! Discovery and session traits
//!
//! The bridge runtime is generic over these two traits. A backend supplies
//! the wire protocol; the runtime supplies supervision, retry and ordering.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::credential::Credential;
use crate::error::Result;
use crate::model::{AppEntry, PlaybackSnapshot, PowerState};

/// A device found during a discovery sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredDevice {
    /// Unique device identifier used for scan filtering
    pub id: String,
    /// Friendly name
    pub name: String,
    /// Model string, for logging
    pub model: String,
    /// Network address
    pub address: String,
}

/// A stateless remote-control button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Up,
    Down,
    Left,
    Right,
    Select,
    Menu,
    Home,
    Play,
    Pause,
    PlayPause,
    Stop,
    Next,
    Previous,
}

impl std::fmt::Display for Button {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Button::Up => "up",
            Button::Down => "down",
            Button::Left => "left",
            Button::Right => "right",
            Button::Select => "select",
            Button::Menu => "menu",
            Button::Home => "home",
            Button::Play => "play",
            Button::Pause => "pause",
            Button::PlayPause => "play_pause",
            Button::Stop => "stop",
            Button::Next => "next",
            Button::Previous => "previous",
        };
        write!(f, "{name}")
    }
}

/// Power transition request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerCommand {
    TurnOn,
    TurnOff,
}

/// Performs discovery and session establishment for one device family.
#[async_trait]
pub trait DeviceScanner: Send + Sync {
    /// Scan the network for devices matching `identifier`, waiting at most
    /// `timeout`. An empty result is not an error; it means nothing
    /// answered in time.
    async fn scan(&self, identifier: &str, timeout: Duration) -> Result<Vec<DiscoveredDevice>>;

    /// Establish a session with a previously discovered device, binding the
    /// given pairing credential.
    async fn connect(
        &self,
        device: &DiscoveredDevice,
        credential: &Credential,
    ) -> Result<Arc<dyn DeviceHandle>>;
}

/// An established session with a device.
///
/// All queries are read-only and idempotent; concurrent calls from the
/// periodic publishers and the command dispatcher are allowed. Capability
/// gaps (no app launch, no URL streaming) surface as
/// [`DeviceError::Unsupported`](crate::DeviceError::Unsupported).
#[async_trait]
pub trait DeviceHandle: Send + Sync {
    /// Fetch the current playback metadata. App and power fields are
    /// reported by [`DeviceHandle::current_app`] and
    /// [`DeviceHandle::power_state`] instead.
    async fn now_playing(&self) -> Result<PlaybackSnapshot>;

    /// The app currently in the foreground, if any.
    async fn current_app(&self) -> Result<Option<AppEntry>>;

    /// Current power state, if the device reports one.
    async fn power_state(&self) -> Result<Option<PowerState>>;

    /// All installed apps, in the device's own order.
    async fn app_list(&self) -> Result<Vec<AppEntry>>;

    /// Press a remote-control button.
    async fn press(&self, button: Button) -> Result<()>;

    /// Request a power transition.
    async fn set_power(&self, command: PowerCommand) -> Result<()>;

    /// Launch the app with the given identifier.
    async fn launch_app(&self, app_id: &str) -> Result<()>;

    /// Start playback of a URL.
    async fn play_url(&self, url: &str) -> Result<()>;

    /// Tear down the session. Idempotent.
    async fn close(&self);

    /// Model string for logging.
    fn model(&self) -> &str;
}
