//! Shared test doubles.

use std::sync::Mutex;

use async_trait::async_trait;

use tvbridge_mqtt::MessagePublisher;

/// One captured publish call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishRecord {
    pub topic: String,
    pub payload: String,
    pub retain: bool,
}

/// Publisher that records every call instead of talking to a broker.
#[derive(Default)]
pub struct RecordingPublisher {
    records: Mutex<Vec<PublishRecord>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<PublishRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn records_for(&self, topic: &str) -> Vec<PublishRecord> {
        self.records()
            .into_iter()
            .filter(|record| record.topic == topic)
            .collect()
    }
}

#[async_trait]
impl MessagePublisher for RecordingPublisher {
    async fn publish(&self, topic: &str, payload: String, retain: bool) {
        self.records.lock().unwrap().push(PublishRecord {
            topic: topic.to_string(),
            payload,
            retain,
        });
    }
}
