//! Inbound message type handed from the broker event loop to the dispatcher.

/// One message received on a subscribed topic, awaiting processing.
///
/// Immutable once constructed; the dispatcher consumes each instance exactly
/// once, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Full topic the message arrived on
    pub topic: String,
    /// Payload decoded as UTF-8 (lossily; command payloads are JSON text)
    pub payload: String,
}

impl InboundMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}
