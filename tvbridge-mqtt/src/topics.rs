//! Topic layout under the configured base prefix.

/// Precomputed topic names for one bridge instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    /// Retained `"online"` / `"offline"` availability marker
    pub availability: String,
    /// Playback state snapshots, not retained
    pub state: String,
    /// Installed app list, retained
    pub apps: String,
    /// Inbound command topic
    pub set: String,
    /// Inbound on-demand fetch topic
    pub get: String,
}

impl Topics {
    /// Build the topic set from a base prefix. A trailing slash on the
    /// prefix is tolerated.
    pub fn new(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            availability: format!("{base}/availability"),
            state: format!("{base}/state"),
            apps: format!("{base}/apps"),
            set: format!("{base}/set"),
            get: format!("{base}/get"),
        }
    }
}
