//! # Sample Store
//!
//! Durable, ordered, append-only buffer of samples waiting to be uploaded.
//!
//! The in-memory buffer and the persisted copy move in lockstep: every
//! mutation re-persists the whole buffer while the buffer lock is still held.
//! If persisting fails the in-memory buffer stays authoritative and the next
//! successful mutation writes it out in full.
//!
//! The write itself (fsync plus rename for [`super::FileStore`]) runs on the
//! blocking pool, so it never stalls a runtime worker.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use super::prefs::TrackerPrefs;
use crate::error::{Result, TrackerError};
use crate::sample::Sample;

/// Buffer of not-yet-acknowledged samples, in capture order.
pub struct SampleStore {
    prefs: Arc<TrackerPrefs>,
    buffer: Mutex<Vec<Sample>>,
}

impl SampleStore {
    /// Create a store seeded from the persisted buffer
    pub fn load(prefs: Arc<TrackerPrefs>) -> Self {
        let buffer = prefs.load_locations();
        debug!("Loaded {} buffered sample(s)", buffer.len());
        Self {
            prefs,
            buffer: Mutex::new(buffer),
        }
    }

    /// Append a sample to the end of the buffer and persist.
    ///
    /// # Errors
    ///
    /// Returns error if the buffer could not be persisted. The sample is kept
    /// in memory either way.
    pub async fn append(&self, sample: Sample) -> Result<()> {
        let mut buffer = self.buffer.lock().await;
        buffer.push(sample);
        self.persist(&buffer).await
    }

    /// Snapshot of the buffer in insertion order
    pub async fn read_all(&self) -> Vec<Sample> {
        self.buffer.lock().await.clone()
    }

    /// Number of buffered samples
    pub async fn len(&self) -> usize {
        self.buffer.lock().await.len()
    }

    /// Whether the buffer is empty
    pub async fn is_empty(&self) -> bool {
        self.buffer.lock().await.is_empty()
    }

    /// Write `buffer` out on the blocking pool. Callers hold the buffer lock so
    /// writes land in mutation order.
    async fn persist(&self, buffer: &[Sample]) -> Result<()> {
        let prefs = Arc::clone(&self.prefs);
        let samples = buffer.to_vec();
        tokio::task::spawn_blocking(move || prefs.save_locations(&samples))
            .await
            .map_err(|e| TrackerError::Store(format!("persist task failed: {}", e)))?
    }

    /// Remove every sample whose timestamp is `<= cutoff` and persist.
    ///
    /// Timestamps compare lexically, which matches chronological order for
    /// the encoding used by [`crate::sample::encode_timestamp`]. The cutoff
    /// does not need to match a stored timestamp. Calling again with the same
    /// or an earlier cutoff removes nothing and writes nothing.
    ///
    /// Returns the number of samples removed.
    ///
    /// # Errors
    ///
    /// Returns error if the trimmed buffer could not be persisted. The
    /// in-memory buffer is trimmed either way.
    pub async fn trim_up_to(&self, cutoff: &str) -> Result<usize> {
        let mut buffer = self.buffer.lock().await;
        let before = buffer.len();
        buffer.retain(|sample| sample.timestamp.as_str() > cutoff);
        let removed = before - buffer.len();

        if removed > 0 {
            debug!("Trimmed {} sample(s) up to {}", removed, cutoff);
            self.persist(&buffer).await?;
        }

        Ok(removed)
    }
}
