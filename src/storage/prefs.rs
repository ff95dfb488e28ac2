//! Typed access to the tracker's persisted keys

use std::sync::Arc;

use rand::Rng;
use tokio::sync::watch;
use tracing::{error, info};

use super::kv::KeyValueStore;
use crate::error::Result;
use crate::sample::Sample;

/// Key holding the JSON array of buffered samples
pub const LOCATIONS_KEY: &str = "locations";

/// Key holding the client identifier
pub const TRACKER_ID_KEY: &str = "tracker-id";

/// Key mirroring whether a tracking session is active (display only)
pub const TRACKING_ENABLED_KEY: &str = "tracking-enabled";

/// Tracker settings and buffer persistence on top of a [`KeyValueStore`].
///
/// Writes of the `tracking-enabled` flag are published on a watch channel so
/// observers can react to session changes without polling the store.
pub struct TrackerPrefs {
    store: Arc<dyn KeyValueStore>,
    tracking_enabled_tx: watch::Sender<bool>,
}

impl TrackerPrefs {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        let initial = read_flag(store.as_ref());
        let (tracking_enabled_tx, _) = watch::channel(initial);
        Self {
            store,
            tracking_enabled_tx,
        }
    }

    /// Last persisted value of the `tracking-enabled` flag
    pub fn is_tracking_enabled(&self) -> bool {
        read_flag(self.store.as_ref())
    }

    /// Persist the `tracking-enabled` flag and notify subscribers of a change.
    ///
    /// Subscribers are notified even when the write fails; the flag is only
    /// informational.
    pub fn set_tracking_enabled(&self, enabled: bool) -> Result<()> {
        let result = self
            .store
            .put(TRACKING_ENABLED_KEY, if enabled { "true" } else { "false" });

        self.tracking_enabled_tx.send_if_modified(|current| {
            if *current == enabled {
                return false;
            }
            *current = enabled;
            true
        });

        result
    }

    /// Watch the `tracking-enabled` flag
    pub fn subscribe_tracking_enabled(&self) -> watch::Receiver<bool> {
        self.tracking_enabled_tx.subscribe()
    }

    /// Client identifier, generated on first use as a random 6-digit string
    pub fn tracker_id(&self) -> Result<String> {
        if let Some(id) = self.store.get(TRACKER_ID_KEY)? {
            if !id.is_empty() {
                return Ok(id);
            }
        }

        let id = format!("{:06}", rand::rng().random_range(0..1_000_000u32));
        self.store.put(TRACKER_ID_KEY, &id)?;
        info!("Generated tracker id {}", id);
        Ok(id)
    }

    /// Load the persisted sample buffer.
    ///
    /// A missing value is an empty buffer. An unreadable or corrupt value is
    /// logged and also treated as empty.
    pub fn load_locations(&self) -> Vec<Sample> {
        let raw = match self.store.get(LOCATIONS_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                error!("Failed to read stored locations: {}", e);
                return Vec::new();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(samples) => samples,
            Err(e) => {
                error!("Stored locations are corrupt, starting empty: {}", e);
                Vec::new()
            }
        }
    }

    /// Persist the full sample buffer
    pub fn save_locations(&self, samples: &[Sample]) -> Result<()> {
        let json = serde_json::to_string(samples)?;
        self.store.put(LOCATIONS_KEY, &json)
    }
}

fn read_flag(store: &dyn KeyValueStore) -> bool {
    matches!(store.get(TRACKING_ENABLED_KEY), Ok(Some(v)) if v == "true")
}
