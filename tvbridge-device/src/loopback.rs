//! In-memory loopback backend
//!
//! Implements [`DeviceScanner`] and [`DeviceHandle`] against process-local
//! state: commands are recorded in a journal instead of hitting a network.
//! The tvbridge test suites drive their ordering and failure-injection
//! scenarios through this backend, and the daemon binary uses it as a
//! stand-in until a real protocol backend is wired in.
//
// TODO: replace the daemon's use of this backend once a companion-protocol
// client exists; the traits in `client` are the integration point.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::client::{Button, DeviceHandle, DeviceScanner, DiscoveredDevice, PowerCommand};
use crate::credential::Credential;
use crate::error::{DeviceError, Result};
use crate::model::{AppEntry, PlaybackSnapshot, PowerState};

#[derive(Default)]
struct DeviceState {
    snapshot: PlaybackSnapshot,
    apps: Vec<AppEntry>,
    journal: Vec<String>,
    fail_now_playing: bool,
    fail_commands: bool,
    failing_commands: usize,
    supports_apps: bool,
    supports_stream: bool,
    closed: bool,
    in_flight: usize,
    max_in_flight: usize,
}

/// A loopback device session. Cheap to clone through an `Arc`; all state is
/// shared.
pub struct LoopbackDevice {
    state: Mutex<DeviceState>,
    /// Artificial latency applied to every command, for concurrency tests
    command_delay: Mutex<Duration>,
}

impl Default for LoopbackDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopbackDevice {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(DeviceState {
                supports_apps: true,
                supports_stream: true,
                ..Default::default()
            }),
            command_delay: Mutex::new(Duration::ZERO),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DeviceState> {
        // A poisoned lock only means a test panicked mid-command.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_snapshot(&self, snapshot: PlaybackSnapshot) {
        self.lock().snapshot = snapshot;
    }

    pub fn set_apps(&self, apps: Vec<AppEntry>) {
        self.lock().apps = apps;
    }

    /// Make `now_playing` fail until reset.
    pub fn fail_now_playing(&self, fail: bool) {
        self.lock().fail_now_playing = fail;
    }

    /// Make every command (press, power, app, stream) fail until reset.
    pub fn fail_commands(&self, fail: bool) {
        self.lock().fail_commands = fail;
    }

    /// Make the next `count` commands fail, then behave normally.
    pub fn fail_next_commands(&self, count: usize) {
        self.lock().failing_commands = count;
    }

    /// Drop the app-launch and app-list capability.
    pub fn disable_apps(&self) {
        self.lock().supports_apps = false;
    }

    /// Drop the URL streaming capability.
    pub fn disable_stream(&self) {
        self.lock().supports_stream = false;
    }

    /// Artificial per-command latency; the in-flight counter spans it.
    pub fn set_command_delay(&self, delay: Duration) {
        *self.command_delay.lock().unwrap_or_else(|e| e.into_inner()) = delay;
    }

    /// Everything executed against this device, in execution order.
    pub fn journal(&self) -> Vec<String> {
        self.lock().journal.clone()
    }

    /// Highest number of commands ever observed executing concurrently.
    pub fn max_in_flight(&self) -> usize {
        self.lock().max_in_flight
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Run one journalled command: enter, optionally stall, record, leave.
    async fn run_command(&self, entry: String) -> Result<()> {
        let delay = {
            let mut state = self.lock();
            if state.fail_commands {
                return Err(DeviceError::Command(format!("injected failure: {entry}")));
            }
            if state.failing_commands > 0 {
                state.failing_commands -= 1;
                return Err(DeviceError::Command(format!("injected failure: {entry}")));
            }
            state.in_flight += 1;
            state.max_in_flight = state.max_in_flight.max(state.in_flight);
            *self.command_delay.lock().unwrap_or_else(|e| e.into_inner())
        };

        if delay > Duration::ZERO {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.lock();
        state.in_flight -= 1;
        state.journal.push(entry);
        Ok(())
    }
}

#[async_trait]
impl DeviceHandle for LoopbackDevice {
    async fn now_playing(&self) -> Result<PlaybackSnapshot> {
        let state = self.lock();
        if state.fail_now_playing {
            return Err(DeviceError::Command("injected metadata failure".into()));
        }
        Ok(state.snapshot.clone())
    }

    async fn current_app(&self) -> Result<Option<AppEntry>> {
        let state = self.lock();
        Ok(state
            .snapshot
            .app
            .as_ref()
            .zip(state.snapshot.app_id.as_ref())
            .map(|(name, id)| AppEntry::new(name, id)))
    }

    async fn power_state(&self) -> Result<Option<PowerState>> {
        Ok(self.lock().snapshot.power_state)
    }

    async fn app_list(&self) -> Result<Vec<AppEntry>> {
        let state = self.lock();
        if !state.supports_apps {
            return Err(DeviceError::Unsupported("app listing"));
        }
        Ok(state.apps.clone())
    }

    async fn press(&self, button: Button) -> Result<()> {
        self.run_command(format!("press:{button}")).await
    }

    async fn set_power(&self, command: PowerCommand) -> Result<()> {
        let entry = match command {
            PowerCommand::TurnOn => "power:on",
            PowerCommand::TurnOff => "power:off",
        };
        self.run_command(entry.to_string()).await
    }

    async fn launch_app(&self, app_id: &str) -> Result<()> {
        if !self.lock().supports_apps {
            return Err(DeviceError::Unsupported("app launch"));
        }
        self.run_command(format!("launch_app:{app_id}")).await
    }

    async fn play_url(&self, url: &str) -> Result<()> {
        if !self.lock().supports_stream {
            return Err(DeviceError::Unsupported("url playback"));
        }
        self.run_command(format!("play_url:{url}")).await
    }

    async fn close(&self) {
        self.lock().closed = true;
    }

    fn model(&self) -> &str {
        "Loopback"
    }
}

/// Scanner over a fixed set of loopback devices.
pub struct LoopbackScanner {
    devices: Vec<(DiscoveredDevice, Arc<LoopbackDevice>)>,
    scan_calls: AtomicUsize,
    failing_scans: AtomicUsize,
    fail_connect: Mutex<bool>,
}

impl LoopbackScanner {
    pub fn new() -> Self {
        Self {
            devices: Vec::new(),
            scan_calls: AtomicUsize::new(0),
            failing_scans: AtomicUsize::new(0),
            fail_connect: Mutex::new(false),
        }
    }

    /// Register a device under the given identity.
    pub fn with_device(
        mut self,
        id: &str,
        name: &str,
        address: &str,
        handle: Arc<LoopbackDevice>,
    ) -> Self {
        self.devices.push((
            DiscoveredDevice {
                id: id.to_string(),
                name: name.to_string(),
                model: "Loopback".to_string(),
                address: address.to_string(),
            },
            handle,
        ));
        self
    }

    /// Convenience constructor for the daemon: a single fresh device.
    pub fn single(id: &str, address: &str) -> Self {
        Self::new().with_device(id, "loopback device", address, Arc::new(LoopbackDevice::new()))
    }

    /// Make the next `count` scans return empty, then behave normally.
    pub fn fail_next_scans(&self, count: usize) {
        self.failing_scans.store(count, Ordering::SeqCst);
    }

    /// Make every connect attempt fail until reset.
    pub fn fail_connect(&self, fail: bool) {
        *self.fail_connect.lock().unwrap_or_else(|e| e.into_inner()) = fail;
    }

    /// Number of scans performed so far.
    pub fn scan_count(&self) -> usize {
        self.scan_calls.load(Ordering::SeqCst)
    }
}

impl Default for LoopbackScanner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeviceScanner for LoopbackScanner {
    async fn scan(&self, identifier: &str, _timeout: Duration) -> Result<Vec<DiscoveredDevice>> {
        self.scan_calls.fetch_add(1, Ordering::SeqCst);

        let remaining = self.failing_scans.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failing_scans.store(remaining - 1, Ordering::SeqCst);
            return Ok(Vec::new());
        }

        Ok(self
            .devices
            .iter()
            .filter(|(device, _)| device.id == identifier)
            .map(|(device, _)| device.clone())
            .collect())
    }

    async fn connect(
        &self,
        device: &DiscoveredDevice,
        _credential: &Credential,
    ) -> Result<Arc<dyn DeviceHandle>> {
        if *self.fail_connect.lock().unwrap_or_else(|e| e.into_inner()) {
            return Err(DeviceError::Connection("injected connect failure".into()));
        }
        self.devices
            .iter()
            .find(|(candidate, _)| candidate.id == device.id)
            .map(|(_, handle)| Arc::clone(handle) as Arc<dyn DeviceHandle>)
            .ok_or_else(|| DeviceError::NotFound {
                identifier: device.id.clone(),
            })
    }
}
