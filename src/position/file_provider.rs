//! Position provider that reads last-known fixes from JSON files.
//!
//! A location daemon (gpsd bridge, modem manager hook, ...) is expected to
//! keep `<dir>/gps.json` and `<dir>/network.json` up to date with the most
//! recent fix of each source:
//!
//! ```json
//! {"latitude": 51.5007, "longitude": -0.1246, "time_ms": 1704067200000}
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::{FixSource, PositionProvider};
use crate::error::{Result, TrackerError};
use crate::sample::Fix;

/// Reads one JSON fix file per source from a directory
#[derive(Debug, Clone)]
pub struct FilePositionProvider {
    dir: PathBuf,
}

impl FilePositionProvider {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Path of the fix file for `source`
    pub fn path_for(&self, source: FixSource) -> PathBuf {
        self.dir.join(format!("{}.json", source.name()))
    }
}

impl PositionProvider for FilePositionProvider {
    fn last_known(&self, source: FixSource) -> Result<Option<Fix>> {
        let path = self.path_for(source);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if contents.trim().is_empty() {
            return Ok(None);
        }

        serde_json::from_str(&contents).map(Some).map_err(|e| {
            TrackerError::MalformedFix(format!("{}: {}", path.display(), e))
        })
    }
}
