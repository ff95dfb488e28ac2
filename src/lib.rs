//! # Geo Tracker Library
//!
//! Periodically sample a device's position and reliably forward the samples
//! to a remote collector over an unreliable network.
//!
//! Samples are buffered durably on the device and only removed once the
//! collector has confirmed them, so transient network failures delay delivery
//! but never lose data.

pub mod config;
pub mod error;
pub mod position;
pub mod sample;
pub mod storage;
pub mod sync;
pub mod tracking;
