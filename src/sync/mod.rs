//! # Sync Module
//!
//! Delivery of buffered samples to the remote collector.
//!
//! This module handles:
//! - The HTTP upload transport (JSON POST, status-code contract)
//! - A scoped host keep-alive for the duration of a retry loop
//! - Upload, bounded retry and trimming of confirmed samples

pub mod keep_alive;
pub mod syncer;
pub mod uploader;

pub use keep_alive::{KeepAlive, KeepAliveGuard, NoopKeepAlive};
pub use syncer::{SyncStatus, Syncer, SYNC_ATTEMPTS};
pub use uploader::{HttpUploader, Uploader};
