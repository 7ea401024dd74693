//! Inbound payload decoding.
//!
//! Command payloads are JSON objects tagged by an `action` field. The set of
//! actions is closed; anything outside it fails to decode and is dropped by
//! the dispatcher before execution. Sequences carry their steps as a flat
//! list of simple actions, so nesting is ruled out at the type level.

use serde::Deserialize;

/// One decoded command from the `set` topic.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Command {
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
    TurnOn,
    TurnOff,
    Wakeup,
    Suspend,
    LaunchApp {
        #[serde(default)]
        app_id: Option<String>,
    },
    PlayUrl {
        #[serde(default)]
        url: Option<String>,
    },
    Multi {
        #[serde(default)]
        commands: Vec<Step>,
    },
}

impl Command {
    /// The action tag, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Up => "up",
            Command::Down => "down",
            Command::Left => "left",
            Command::Right => "right",
            Command::Select => "select",
            Command::Menu => "menu",
            Command::Home => "home",
            Command::Play => "play",
            Command::Pause => "pause",
            Command::PlayPause => "play_pause",
            Command::Stop => "stop",
            Command::Next => "next",
            Command::Previous => "previous",
            Command::TurnOn => "turn_on",
            Command::TurnOff => "turn_off",
            Command::Wakeup => "wakeup",
            Command::Suspend => "suspend",
            Command::LaunchApp { .. } => "launch_app",
            Command::PlayUrl { .. } => "play_url",
            Command::Multi { .. } => "multi",
        }
    }
}

/// A single step inside a `multi` sequence. Only simple actions qualify;
/// app launches, URL playback and nested sequences are not steps.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
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
    TurnOn,
    TurnOff,
    Wakeup,
    Suspend,
}

impl From<Step> for Command {
    fn from(step: Step) -> Self {
        match step {
            Step::Up => Command::Up,
            Step::Down => Command::Down,
            Step::Left => Command::Left,
            Step::Right => Command::Right,
            Step::Select => Command::Select,
            Step::Menu => Command::Menu,
            Step::Home => Command::Home,
            Step::Play => Command::Play,
            Step::Pause => Command::Pause,
            Step::PlayPause => Command::PlayPause,
            Step::Stop => Command::Stop,
            Step::Next => Command::Next,
            Step::Previous => Command::Previous,
            Step::TurnOn => Command::TurnOn,
            Step::TurnOff => Command::TurnOff,
            Step::Wakeup => Command::Wakeup,
            Step::Suspend => Command::Suspend,
        }
    }
}

/// Which snapshots an on-demand fetch should publish.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GetKind {
    State,
    Apps,
    #[default]
    All,
}

/// One decoded request from the `get` topic. An empty object asks for
/// everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct GetRequest {
    #[serde(default, rename = "type")]
    pub kind: GetKind,
}

impl GetRequest {
    pub fn wants_state(&self) -> bool {
        matches!(self.kind, GetKind::State | GetKind::All)
    }

    pub fn wants_apps(&self) -> bool {
        matches!(self.kind, GetKind::Apps | GetKind::All)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(payload: &str) -> Result<Command, serde_json::Error> {
        serde_json::from_str(payload)
    }

    #[test]
    fn decodes_simple_actions() {
        assert_eq!(decode(r#"{"action":"play"}"#).unwrap(), Command::Play);
        assert_eq!(decode(r#"{"action":"play_pause"}"#).unwrap(), Command::PlayPause);
        assert_eq!(decode(r#"{"action":"turn_off"}"#).unwrap(), Command::TurnOff);
    }

    #[test]
    fn decodes_launch_app_with_and_without_id() {
        assert_eq!(
            decode(r#"{"action":"launch_app","app_id":"com.example.tv"}"#).unwrap(),
            Command::LaunchApp {
                app_id: Some("com.example.tv".to_string())
            }
        );
        assert_eq!(
            decode(r#"{"action":"launch_app"}"#).unwrap(),
            Command::LaunchApp { app_id: None }
        );
    }

    #[test]
    fn decodes_play_url() {
        assert_eq!(
            decode(r#"{"action":"play_url","url":"http://example/stream.m3u8"}"#).unwrap(),
            Command::PlayUrl {
                url: Some("http://example/stream.m3u8".to_string())
            }
        );
    }

    #[test]
    fn decodes_multi_with_steps_in_order() {
        let command = decode(r#"{"action":"multi","commands":["wakeup","up","select"]}"#).unwrap();
        assert_eq!(
            command,
            Command::Multi {
                commands: vec![Step::Wakeup, Step::Up, Step::Select]
            }
        );
    }

    #[test]
    fn multi_without_commands_decodes_empty() {
        assert_eq!(
            decode(r#"{"action":"multi"}"#).unwrap(),
            Command::Multi { commands: vec![] }
        );
    }

    #[test]
    fn nested_multi_is_rejected() {
        assert!(decode(r#"{"action":"multi","commands":["multi"]}"#).is_err());
        assert!(decode(r#"{"action":"multi","commands":["launch_app"]}"#).is_err());
    }

    #[test]
    fn unknown_action_is_rejected() {
        assert!(decode(r#"{"action":"self_destruct"}"#).is_err());
    }

    #[test]
    fn missing_action_is_rejected() {
        assert!(decode(r#"{"app_id":"com.example"}"#).is_err());
        assert!(decode("not json at all").is_err());
    }

    #[test]
    fn unknown_extra_fields_are_tolerated() {
        assert_eq!(decode(r#"{"action":"up","source":"wall panel"}"#).unwrap(), Command::Up);
    }

    #[test]
    fn step_maps_onto_the_matching_command() {
        assert_eq!(Command::from(Step::PlayPause), Command::PlayPause);
        assert_eq!(Command::from(Step::TurnOn), Command::TurnOn);
    }

    #[test]
    fn get_request_defaults_to_all() {
        let request: GetRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(request.kind, GetKind::All);
        assert!(request.wants_state());
        assert!(request.wants_apps());
    }

    #[test]
    fn get_request_narrows_by_type() {
        let request: GetRequest = serde_json::from_str(r#"{"type":"state"}"#).unwrap();
        assert!(request.wants_state());
        assert!(!request.wants_apps());

        let request: GetRequest = serde_json::from_str(r#"{"type":"apps"}"#).unwrap();
        assert!(!request.wants_state());
        assert!(request.wants_apps());
    }

    #[test]
    fn unknown_get_type_is_rejected() {
        assert!(serde_json::from_str::<GetRequest>(r#"{"type":"everything"}"#).is_err());
    }
}
