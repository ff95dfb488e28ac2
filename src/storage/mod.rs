//! # Storage Module
//!
//! Local persistence for the tracker.
//!
//! This module handles:
//! - A durable string key/value store (one file per key)
//! - Typed access to the persisted keys (`locations`, `tracker-id`, `tracking-enabled`)
//! - The append-only sample buffer with prefix trimming

pub mod kv;
pub mod prefs;
pub mod sample_store;

pub use kv::{FileStore, KeyValueStore};
pub use prefs::TrackerPrefs;
pub use sample_store::SampleStore;
