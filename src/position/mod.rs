//! # Position Module
//!
//! Obtaining position fixes and turning them into buffered samples.
//!
//! This module handles:
//! - The positioning collaborator seam (`PositionProvider`)
//! - A file-backed provider for Linux hosts
//! - Choosing the best last-known fix across sources
//! - Appending the chosen fix to the sample buffer

pub mod file_provider;
pub mod sampler;

pub use file_provider::FilePositionProvider;
pub use sampler::{SampleOutcome, Sampler};

use crate::error::Result;
use crate::sample::Fix;

/// Where a fix came from.
///
/// GPS is the higher-accuracy source; network positioning is the fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FixSource {
    Gps,
    Network,
}

impl FixSource {
    /// File stem / log name of the source
    pub fn name(self) -> &'static str {
        match self {
            FixSource::Gps => "gps",
            FixSource::Network => "network",
        }
    }
}

/// Platform positioning API.
#[cfg_attr(test, mockall::automock)]
pub trait PositionProvider: Send + Sync {
    /// Last known fix from `source`, or `None` if that source has none
    fn last_known(&self, source: FixSource) -> Result<Option<Fix>>;
}
