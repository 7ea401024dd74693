//! Error types for device discovery and session operations.

/// Errors that can occur while discovering or talking to a device.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// No device matching the configured identifier answered the scan
    #[error("device {identifier} not found on the network")]
    NotFound {
        /// The identifier that was searched for
        identifier: String,
    },

    /// The discovery sweep itself failed
    #[error("discovery failed: {0}")]
    Discovery(String),

    /// Establishing the session failed
    #[error("connection failed: {0}")]
    Connection(String),

    /// A single command or query against an established session failed
    #[error("command failed: {0}")]
    Command(String),

    /// The device lacks the requested capability
    #[error("device does not support {0}")]
    Unsupported(&'static str),

    /// The credential string could not be parsed
    #[error("invalid credential: {0}")]
    InvalidCredential(String),
}

/// Result alias used throughout the device interface.
pub type Result<T> = std::result::Result<T, DeviceError>;
