//! Command execution against the live device session.
//!
//! The dispatcher hands decoded commands here one at a time, so at most one
//! command is ever in flight. Execution failures are logged and swallowed;
//! a broken command must not take the bridge down.

use std::time::Duration;

use tracing::{debug, error, info, warn};

use tvbridge_device::{Button, DeviceError, DeviceHandle, PowerCommand};

use crate::command::Command;
use crate::supervisor::DeviceLink;

/// Pause between sequence steps, giving the device time to settle.
pub const STEP_PAUSE: Duration = Duration::from_millis(300);

/// Executes decoded commands against whatever session the link holds.
pub struct Executor {
    link: DeviceLink,
    step_pause: Duration,
}

impl Executor {
    pub fn new(link: DeviceLink) -> Self {
        Self {
            link,
            step_pause: STEP_PAUSE,
        }
    }

    /// Override the inter-step pause. Intended for tests.
    pub fn with_step_pause(mut self, pause: Duration) -> Self {
        self.step_pause = pause;
        self
    }

    /// Execute one command. Sequences run their steps in order, pausing
    /// after each; a failing step is logged and the rest still run.
    pub async fn execute(&self, command: Command) {
        let Some(device) = self.link.current().await else {
            warn!(action = command.name(), "no device session, dropping command");
            return;
        };

        match command {
            Command::Multi { commands } => {
                debug!(steps = commands.len(), "executing command sequence");
                for step in commands {
                    let step = Command::from(step);
                    match self.run_single(device.as_ref(), &step).await {
                        Ok(()) => info!(action = step.name(), "executed command"),
                        Err(error) => {
                            warn!(action = step.name(), %error, "sequence step failed, continuing")
                        }
                    }
                    tokio::time::sleep(self.step_pause).await;
                }
            }
            command => match self.run_single(device.as_ref(), &command).await {
                Ok(()) => info!(action = command.name(), "executed command"),
                Err(error @ DeviceError::Unsupported(_)) => {
                    warn!(action = command.name(), %error, "command not supported by this device")
                }
                Err(error) => error!(action = command.name(), %error, "command failed"),
            },
        }
    }

    async fn run_single(
        &self,
        device: &dyn DeviceHandle,
        command: &Command,
    ) -> tvbridge_device::Result<()> {
        match command {
            Command::Up => device.press(Button::Up).await,
            Command::Down => device.press(Button::Down).await,
            Command::Left => device.press(Button::Left).await,
            Command::Right => device.press(Button::Right).await,
            Command::Select => device.press(Button::Select).await,
            Command::Menu => device.press(Button::Menu).await,
            Command::Home => device.press(Button::Home).await,
            Command::Play => device.press(Button::Play).await,
            Command::Pause => device.press(Button::Pause).await,
            Command::PlayPause => device.press(Button::PlayPause).await,
            Command::Stop => device.press(Button::Stop).await,
            Command::Next => device.press(Button::Next).await,
            Command::Previous => device.press(Button::Previous).await,
            Command::TurnOn | Command::Wakeup => device.set_power(PowerCommand::TurnOn).await,
            Command::TurnOff | Command::Suspend => device.set_power(PowerCommand::TurnOff).await,
            Command::LaunchApp { app_id } => match app_id {
                Some(app_id) => device.launch_app(app_id).await,
                None => {
                    warn!("launch_app without an app_id, ignoring");
                    Ok(())
                }
            },
            Command::PlayUrl { url } => match url {
                Some(url) => device.play_url(url).await,
                None => {
                    warn!("play_url without a url, ignoring");
                    Ok(())
                }
            },
            // Sequences are flattened by `execute`; steps cannot nest.
            Command::Multi { .. } => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Step;
    use std::sync::Arc;
    use std::time::Instant;
    use tvbridge_device::loopback::LoopbackDevice;

    async fn executor_with_device() -> (Executor, Arc<LoopbackDevice>) {
        let device = Arc::new(LoopbackDevice::new());
        let link = DeviceLink::new();
        link.replace(Arc::clone(&device) as Arc<dyn DeviceHandle>).await;
        (
            Executor::new(link).with_step_pause(Duration::from_millis(1)),
            device,
        )
    }

    #[tokio::test]
    async fn button_commands_reach_the_device() {
        let (executor, device) = executor_with_device().await;

        executor.execute(Command::Play).await;
        executor.execute(Command::Menu).await;

        assert_eq!(device.journal(), vec!["press:play", "press:menu"]);
    }

    #[tokio::test]
    async fn power_synonyms_map_to_transitions() {
        let (executor, device) = executor_with_device().await;

        executor.execute(Command::Wakeup).await;
        executor.execute(Command::TurnOff).await;
        executor.execute(Command::TurnOn).await;
        executor.execute(Command::Suspend).await;

        assert_eq!(
            device.journal(),
            vec!["power:on", "power:off", "power:on", "power:off"]
        );
    }

    #[tokio::test]
    async fn launch_app_and_play_url_pass_their_arguments() {
        let (executor, device) = executor_with_device().await;

        executor
            .execute(Command::LaunchApp {
                app_id: Some("com.example.tv".to_string()),
            })
            .await;
        executor
            .execute(Command::PlayUrl {
                url: Some("http://example/live.m3u8".to_string()),
            })
            .await;

        assert_eq!(
            device.journal(),
            vec![
                "launch_app:com.example.tv",
                "play_url:http://example/live.m3u8"
            ]
        );
    }

    #[tokio::test]
    async fn missing_arguments_are_dropped_without_device_traffic() {
        let (executor, device) = executor_with_device().await;

        executor.execute(Command::LaunchApp { app_id: None }).await;
        executor.execute(Command::PlayUrl { url: None }).await;

        assert!(device.journal().is_empty());
    }

    #[tokio::test]
    async fn unsupported_commands_are_swallowed() {
        let (executor, device) = executor_with_device().await;
        device.disable_stream();

        executor
            .execute(Command::PlayUrl {
                url: Some("http://example/live.m3u8".to_string()),
            })
            .await;

        assert!(device.journal().is_empty());
    }

    #[tokio::test]
    async fn no_session_means_no_execution() {
        let executor = Executor::new(DeviceLink::new());
        // Nothing to assert against a device; reaching the end without a
        // panic is the contract.
        executor.execute(Command::Play).await;
    }

    #[tokio::test]
    async fn sequence_runs_steps_in_order() {
        let (executor, device) = executor_with_device().await;

        executor
            .execute(Command::Multi {
                commands: vec![Step::Wakeup, Step::Up, Step::Select],
            })
            .await;

        assert_eq!(device.journal(), vec!["power:on", "press:up", "press:select"]);
    }

    #[tokio::test]
    async fn sequence_continues_past_a_failing_step() {
        let (executor, device) = executor_with_device().await;
        device.fail_next_commands(1);

        executor
            .execute(Command::Multi {
                commands: vec![Step::Play, Step::Select],
            })
            .await;

        assert_eq!(device.journal(), vec!["press:select"]);
    }

    #[tokio::test]
    async fn sequence_pauses_after_each_step() {
        let device = Arc::new(LoopbackDevice::new());
        let link = DeviceLink::new();
        link.replace(Arc::clone(&device) as Arc<dyn DeviceHandle>).await;
        let executor = Executor::new(link).with_step_pause(Duration::from_millis(40));

        let started = Instant::now();
        executor
            .execute(Command::Multi {
                commands: vec![Step::Up, Step::Down],
            })
            .await;

        assert!(started.elapsed() >= Duration::from_millis(80));
        assert_eq!(device.journal(), vec!["press:up", "press:down"]);
    }
}
