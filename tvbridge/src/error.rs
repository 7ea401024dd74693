//! Fatal runtime errors.

use tvbridge_mqtt::BusError;

/// Failures that end the bridge process with a non-zero exit.
///
/// Everything recoverable is retried or logged inside the components; only
/// startup failures bubble up here.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// The initial broker connection never came up
    #[error("could not establish the initial broker connection")]
    BrokerUnavailable,

    /// The initial device session never came up
    #[error("could not establish the initial device session")]
    DeviceUnavailable,

    /// Broker configuration was rejected before connecting
    #[error(transparent)]
    Bus(#[from] BusError),
}
