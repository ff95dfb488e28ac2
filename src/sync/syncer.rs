//! # Syncer
//!
//! Uploads the sample buffer to the collector and trims what was confirmed.
//!
//! ## Upload cycle
//!
//! 1. Snapshot the buffer. Empty buffer is a success with no request.
//! 2. POST the snapshot as a JSON array.
//! 3. On HTTP 200, trim everything up to the timestamp of the last sample in
//!    the snapshot. Samples appended while the request was in flight are
//!    kept unless their timestamp is at or before that cutoff.
//! 4. Anything else leaves the buffer untouched.
//!
//! `sync_with_retry` runs up to [`SYNC_ATTEMPTS`] cycles back to back under a
//! sync mutex that is separate from the buffer lock, so sampling continues
//! while an upload is slow and two upload loops never overlap. Callers that
//! queue on the mutex use `sync_with_retry`; periodic callers use
//! `try_sync_with_retry`, which skips when a loop is already running.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::{watch, Mutex, MutexGuard};
use tracing::{debug, error, info, warn};

use super::keep_alive::{KeepAlive, KeepAliveGuard};
use super::uploader::Uploader;
use crate::error::{Result, TrackerError};
use crate::sample::Sample;
use crate::storage::SampleStore;

/// Upload attempts per `sync_with_retry` call
pub const SYNC_ATTEMPTS: u32 = 3;

/// User-visible state of the last upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStatus {
    /// Nothing attempted yet
    Idle,
    /// Last upload confirmed `uploaded` samples
    Synced { uploaded: usize },
    /// Last upload failed; buffer kept for the next cycle
    Failed { message: String },
}

impl SyncStatus {
    /// Status line for display; empty unless the last upload failed
    pub fn message(&self) -> String {
        match self {
            SyncStatus::Failed { message } => format!("Last server sync failed. {}", message),
            _ => String::new(),
        }
    }
}

/// Uploads and trims the sample buffer
pub struct Syncer {
    store: Arc<SampleStore>,
    uploader: Arc<dyn Uploader>,
    keep_alive: Arc<dyn KeepAlive>,
    status_tx: watch::Sender<SyncStatus>,
    sync_lock: Mutex<()>,
}

impl Syncer {
    pub fn new(
        store: Arc<SampleStore>,
        uploader: Arc<dyn Uploader>,
        keep_alive: Arc<dyn KeepAlive>,
    ) -> Self {
        let (status_tx, _) = watch::channel(SyncStatus::Idle);
        Self {
            store,
            uploader,
            keep_alive,
            status_tx,
            sync_lock: Mutex::new(()),
        }
    }

    /// Watch upload status changes
    pub fn subscribe_status(&self) -> watch::Receiver<SyncStatus> {
        self.status_tx.subscribe()
    }

    /// Current upload status
    pub fn status(&self) -> SyncStatus {
        self.status_tx.borrow().clone()
    }

    /// Run one upload cycle against `endpoint`.
    ///
    /// Returns `true` if the buffer was empty or the collector confirmed the
    /// upload.
    pub async fn sync_once(&self, endpoint: &str) -> bool {
        let snapshot = self.store.read_all().await;
        if snapshot.is_empty() {
            return true;
        }

        match self.upload(endpoint, &snapshot).await {
            Ok(()) => {
                info!("Uploaded {} sample(s)", snapshot.len());
                self.status_tx.send_replace(SyncStatus::Synced {
                    uploaded: snapshot.len(),
                });
                true
            }
            Err(e) => {
                warn!("Sync of {} sample(s) failed: {}", snapshot.len(), e);
                self.status_tx.send_replace(SyncStatus::Failed {
                    message: e.to_string(),
                });
                false
            }
        }
    }

    async fn upload(&self, endpoint: &str, snapshot: &[Sample]) -> Result<()> {
        let body = Bytes::from(serde_json::to_vec(snapshot)?);
        debug!("Sending updates: {}", snapshot.len());

        let status = self.uploader.post_json(endpoint, body).await?;
        if status != 200 {
            return Err(TrackerError::UnexpectedStatus(status));
        }

        if let Some(last) = snapshot.last() {
            // Upload is already confirmed; a persist failure only delays durability
            if let Err(e) = self.store.trim_up_to(&last.timestamp).await {
                error!("Failed to persist trimmed buffer: {}", e);
            }
        }
        Ok(())
    }

    /// Run up to [`SYNC_ATTEMPTS`] upload cycles, stopping at the first
    /// success.
    ///
    /// Waits for any other in-flight `sync_with_retry` to finish first. The
    /// host keep-alive is held for the whole loop.
    pub async fn sync_with_retry(&self, endpoint: &str) -> bool {
        let in_flight = self.sync_lock.lock().await;
        self.retry_loop(endpoint, in_flight).await
    }

    /// Like [`Syncer::sync_with_retry`], but returns `None` without uploading
    /// if another upload loop is already running.
    pub async fn try_sync_with_retry(&self, endpoint: &str) -> Option<bool> {
        match self.sync_lock.try_lock() {
            Ok(in_flight) => Some(self.retry_loop(endpoint, in_flight).await),
            Err(_) => {
                debug!("Sync already in progress, skipping");
                None
            }
        }
    }

    /// Whether an upload loop currently holds the sync lock
    pub fn is_syncing(&self) -> bool {
        self.sync_lock.try_lock().is_err()
    }

    async fn retry_loop(&self, endpoint: &str, _in_flight: MutexGuard<'_, ()>) -> bool {
        let _awake = KeepAliveGuard::acquire(self.keep_alive.as_ref());

        for attempt in 1..=SYNC_ATTEMPTS {
            if self.sync_once(endpoint).await {
                return true;
            }
            debug!("Sync attempt {}/{} failed", attempt, SYNC_ATTEMPTS);
        }

        false
    }
}
