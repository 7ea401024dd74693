//! Environment-driven configuration.
//!
//! Every setting except `LOG_LEVEL` is required; validation collects every
//! problem before reporting so a misconfigured deployment fails with one
//! complete message instead of one variable at a time.

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use tvbridge_device::Credential;

/// Variables that must be present and non-empty.
pub const REQUIRED_KEYS: [&str; 13] = [
    "MQTT_HOST",
    "MQTT_PORT",
    "MQTT_USER",
    "MQTT_PASSWORD",
    "MQTT_QOS",
    "MQTT_BASE_TOPIC",
    "DEVICE_ID",
    "DEVICE_CREDENTIALS",
    "DEVICE_ADDRESS",
    "STATE_UPDATE_INTERVAL",
    "APPS_UPDATE_INTERVAL",
    "MQTT_RECONNECT_DELAY",
    "DEVICE_RECONNECT_DELAY",
];

/// Fully validated runtime configuration.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub mqtt_host: String,
    pub mqtt_port: u16,
    pub mqtt_user: String,
    pub mqtt_password: String,
    pub mqtt_qos: u8,
    pub base_topic: String,
    pub device_id: String,
    pub device_credentials: Credential,
    pub device_address: String,
    pub state_interval: Duration,
    pub apps_interval: Duration,
    pub mqtt_reconnect_delay: Duration,
    pub device_reconnect_delay: Duration,
    pub log_level: String,
}

/// Everything wrong with the environment, in one report.
#[derive(Debug, Default)]
pub struct ConfigError {
    pub missing: Vec<&'static str>,
    pub invalid: Vec<String>,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if !self.missing.is_empty() {
            parts.push(format!(
                "missing required environment variables: {}",
                self.missing.join(", ")
            ));
        }
        if !self.invalid.is_empty() {
            parts.push(format!("invalid values: {}", self.invalid.join(", ")));
        }
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for ConfigError {}

impl BridgeConfig {
    /// Read and validate the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Like [`BridgeConfig::from_env`] but with a pluggable source, so
    /// validation can be tested without touching the real environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut error = ConfigError::default();

        let mut require = |key: &'static str| match lookup(key).filter(|v| !v.is_empty()) {
            Some(value) => Some(value),
            None => {
                error.missing.push(key);
                None
            }
        };

        let mqtt_host = require("MQTT_HOST");
        let mqtt_port = require("MQTT_PORT");
        let mqtt_user = require("MQTT_USER");
        let mqtt_password = require("MQTT_PASSWORD");
        let mqtt_qos = require("MQTT_QOS");
        let base_topic = require("MQTT_BASE_TOPIC");
        let device_id = require("DEVICE_ID");
        let device_credentials = require("DEVICE_CREDENTIALS");
        let device_address = require("DEVICE_ADDRESS");
        let state_interval = require("STATE_UPDATE_INTERVAL");
        let apps_interval = require("APPS_UPDATE_INTERVAL");
        let mqtt_reconnect_delay = require("MQTT_RECONNECT_DELAY");
        let device_reconnect_delay = require("DEVICE_RECONNECT_DELAY");
        let log_level = lookup("LOG_LEVEL")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "info".to_string());

        let mqtt_port: Option<u16> = parse_value(mqtt_port, "MQTT_PORT", &mut error.invalid);
        let mqtt_qos: Option<u8> = parse_value(mqtt_qos, "MQTT_QOS", &mut error.invalid);
        let mqtt_qos = match mqtt_qos {
            Some(qos) if qos > 2 => {
                error.invalid.push(format!("MQTT_QOS={qos} (expected 0, 1 or 2)"));
                None
            }
            other => other,
        };
        let state_interval = parse_seconds(state_interval, "STATE_UPDATE_INTERVAL", &mut error.invalid);
        let apps_interval = parse_seconds(apps_interval, "APPS_UPDATE_INTERVAL", &mut error.invalid);
        let mqtt_reconnect_delay =
            parse_seconds(mqtt_reconnect_delay, "MQTT_RECONNECT_DELAY", &mut error.invalid);
        let device_reconnect_delay =
            parse_seconds(device_reconnect_delay, "DEVICE_RECONNECT_DELAY", &mut error.invalid);
        let device_credentials = device_credentials.and_then(|raw| match Credential::parse(&raw) {
            Ok(credential) => Some(credential),
            Err(parse_error) => {
                error.invalid.push(format!("DEVICE_CREDENTIALS ({parse_error})"));
                None
            }
        });

        match (
            mqtt_host,
            mqtt_port,
            mqtt_user,
            mqtt_password,
            mqtt_qos,
            base_topic,
            device_id,
            device_credentials,
            device_address,
            state_interval,
            apps_interval,
            mqtt_reconnect_delay,
            device_reconnect_delay,
        ) {
            (
                Some(mqtt_host),
                Some(mqtt_port),
                Some(mqtt_user),
                Some(mqtt_password),
                Some(mqtt_qos),
                Some(base_topic),
                Some(device_id),
                Some(device_credentials),
                Some(device_address),
                Some(state_interval),
                Some(apps_interval),
                Some(mqtt_reconnect_delay),
                Some(device_reconnect_delay),
            ) => Ok(Self {
                mqtt_host,
                mqtt_port,
                mqtt_user,
                mqtt_password,
                mqtt_qos,
                base_topic,
                device_id,
                device_credentials,
                device_address,
                state_interval,
                apps_interval,
                mqtt_reconnect_delay,
                device_reconnect_delay,
                log_level,
            }),
            _ => Err(error),
        }
    }
}

fn parse_value<T: FromStr>(
    value: Option<String>,
    key: &str,
    invalid: &mut Vec<String>,
) -> Option<T> {
    let value = value?;
    match value.parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            invalid.push(format!("{key}={value}"));
            None
        }
    }
}

fn parse_seconds(value: Option<String>, key: &str, invalid: &mut Vec<String>) -> Option<Duration> {
    parse_value::<u64>(value, key, invalid).map(Duration::from_secs)
}
