//! Error types for the broker link.

/// Errors surfaced by the bus supervisor.
///
/// Transient broker trouble is retried internally and logged, never
/// returned; these variants only cover conditions the runtime must react
/// to.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    /// Shutdown was requested before the first connection was established
    #[error("shutdown requested before the broker connection was established")]
    ShutdownRequested,

    /// The quality-of-service level in the configuration is out of range
    #[error("invalid QoS level {0}, expected 0, 1 or 2")]
    InvalidQos(u8),
}
