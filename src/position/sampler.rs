//! # Sampler
//!
//! Captures the current best-known position into the sample buffer.
//!
//! ## Source selection
//!
//! The network fix is the baseline. The GPS fix replaces it when GPS has a
//! fix that is at least as recent, so an older GPS fix never beats a newer
//! network fix but a tie goes to the more accurate source.

use std::sync::Arc;

use tracing::{debug, error, warn};

use super::{FixSource, PositionProvider};
use crate::error::Result;
use crate::sample::{Fix, Sample};
use crate::storage::SampleStore;

/// Result of one sampling attempt
#[derive(Debug, Clone, PartialEq)]
pub enum SampleOutcome {
    /// A sample was appended to the buffer
    Captured(Sample),
    /// No source had a fix; nothing was written
    Unavailable,
    /// The fix could not be converted; nothing was written
    Failed,
}

/// Pick the better of a GPS and a network fix.
///
/// GPS wins when its fix time is at least as recent as the network fix.
pub fn select_best_fix(gps: Option<Fix>, network: Option<Fix>) -> Option<Fix> {
    match (gps, network) {
        (Some(gps), Some(network)) if gps.time_ms >= network.time_ms => Some(gps),
        (Some(_), Some(network)) => Some(network),
        (gps, network) => gps.or(network),
    }
}

/// Appends the best last-known fix to the [`SampleStore`]
pub struct Sampler {
    provider: Arc<dyn PositionProvider>,
    store: Arc<SampleStore>,
}

impl Sampler {
    pub fn new(provider: Arc<dyn PositionProvider>, store: Arc<SampleStore>) -> Self {
        Self { provider, store }
    }

    /// Best last-known fix across all sources.
    ///
    /// A source that fails to report is logged and treated as having no fix.
    pub fn best_fix(&self) -> Option<Fix> {
        let gps = self.read_source(FixSource::Gps);
        let network = self.read_source(FixSource::Network);
        select_best_fix(gps, network)
    }

    fn read_source(&self, source: FixSource) -> Option<Fix> {
        match self.provider.last_known(source) {
            Ok(fix) => fix,
            Err(e) => {
                warn!("Ignoring {} fix: {}", source.name(), e);
                None
            }
        }
    }

    /// Take one sample.
    ///
    /// Never fails outward: an unavailable position or a malformed fix leaves
    /// the buffer untouched and is reported through [`SampleOutcome`].
    pub async fn sample(&self) -> SampleOutcome {
        let Some(fix) = self.best_fix() else {
            debug!("No position fix available, skipping sample");
            return SampleOutcome::Unavailable;
        };

        match self.capture(fix).await {
            Ok(sample) => SampleOutcome::Captured(sample),
            Err(e) => {
                warn!("Discarding fix {:?}: {}", fix, e);
                SampleOutcome::Failed
            }
        }
    }

    async fn capture(&self, fix: Fix) -> Result<Sample> {
        let sample = fix.to_sample()?;

        // The sample is buffered in memory even when persisting fails
        if let Err(e) = self.store.append(sample.clone()).await {
            error!("Failed to persist sample buffer: {}", e);
        }

        debug!("Location: {:?}", sample);
        Ok(sample)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TrackerError;
    use crate::position::MockPositionProvider;
    use crate::storage::kv::mocks::MemoryStore;
    use crate::storage::TrackerPrefs;
    use mockall::predicate::eq;

    fn new_store() -> Arc<SampleStore> {
        let prefs = Arc::new(TrackerPrefs::new(Arc::new(MemoryStore::new())));
        Arc::new(SampleStore::load(prefs))
    }

    fn provider(gps: Option<Fix>, network: Option<Fix>) -> MockPositionProvider {
        let mut mock = MockPositionProvider::new();
        mock.expect_last_known()
            .with(eq(FixSource::Gps))
            .returning(move |_| Ok(gps));
        mock.expect_last_known()
            .with(eq(FixSource::Network))
            .returning(move |_| Ok(network));
        mock
    }

    #[test]
    fn test_select_prefers_gps_when_as_recent() {
        let gps = Fix::new(1.0, 1.0, 1000);
        let network = Fix::new(2.0, 2.0, 1000);
        assert_eq!(select_best_fix(Some(gps), Some(network)), Some(gps));
    }

    #[test]
    fn test_select_prefers_newer_network_over_stale_gps() {
        let gps = Fix::new(1.0, 1.0, 999);
        let network = Fix::new(2.0, 2.0, 1000);
        assert_eq!(select_best_fix(Some(gps), Some(network)), Some(network));
    }

    #[test]
    fn test_select_with_single_source() {
        let fix = Fix::new(1.0, 1.0, 5);
        assert_eq!(select_best_fix(Some(fix), None), Some(fix));
        assert_eq!(select_best_fix(None, Some(fix)), Some(fix));
        assert_eq!(select_best_fix(None, None), None);
    }

    #[tokio::test]
    async fn test_sample_appends_best_fix() {
        let store = new_store();
        let sampler = Sampler::new(
            Arc::new(provider(
                Some(Fix::new(1.0, 2.0, 1_704_067_260_000)),
                Some(Fix::new(9.0, 9.0, 1_704_067_200_000)),
            )),
            Arc::clone(&store),
        );

        let expected = Sample::new(1.0, 2.0, "2024-01-01T00:01:00.000Z");
        assert_eq!(sampler.sample().await, SampleOutcome::Captured(expected.clone()));
        assert_eq!(store.read_all().await, vec![expected]);
    }

    #[tokio::test]
    async fn test_unavailable_leaves_buffer_untouched() {
        let store = new_store();
        let sampler = Sampler::new(Arc::new(provider(None, None)), Arc::clone(&store));

        assert_eq!(sampler.sample().await, SampleOutcome::Unavailable);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_malformed_fix_is_contained() {
        let store = new_store();
        let sampler = Sampler::new(
            Arc::new(provider(Some(Fix::new(f64::NAN, 0.0, 0)), None)),
            Arc::clone(&store),
        );

        assert_eq!(sampler.sample().await, SampleOutcome::Failed);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_failing_source_falls_back_to_other() {
        let mut mock = MockPositionProvider::new();
        mock.expect_last_known()
            .with(eq(FixSource::Gps))
            .returning(|_| Err(TrackerError::MalformedFix("garbage".to_string())));
        mock.expect_last_known()
            .with(eq(FixSource::Network))
            .returning(|_| Ok(Some(Fix::new(3.0, 4.0, 0))));

        let store = new_store();
        let sampler = Sampler::new(Arc::new(mock), Arc::clone(&store));

        assert!(matches!(sampler.sample().await, SampleOutcome::Captured(_)));
        assert_eq!(
            store.read_all().await,
            vec![Sample::new(3.0, 4.0, "1970-01-01T00:00:00.000Z")]
        );
    }

    #[tokio::test]
    async fn test_persist_failure_still_captures() {
        let kv = MemoryStore::new();
        let store = Arc::new(SampleStore::load(Arc::new(TrackerPrefs::new(Arc::new(
            kv.clone(),
        )))));
        kv.set_fail_writes(true);

        let sampler = Sampler::new(
            Arc::new(provider(None, Some(Fix::new(1.0, 1.0, 0)))),
            Arc::clone(&store),
        );

        assert!(matches!(sampler.sample().await, SampleOutcome::Captured(_)));
        assert_eq!(store.len().await, 1);
    }
}
