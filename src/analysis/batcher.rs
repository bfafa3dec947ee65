use crate::client::{CatalogService, MAX_FEATURE_BATCH};
use crate::error::AnalysisError;
use crate::models::{AudioFeatures, TrackEntry};

/// Looks up audio features for a playlist's entries in catalog-sized batches
pub struct FeatureBatcher;

impl FeatureBatcher {
    /// Ids of the entries that can be analyzed, in playlist order.
    /// Local files and removed tracks are dropped silently.
    pub fn track_ids(entries: &[TrackEntry]) -> Vec<String> {
        entries
            .iter()
            .filter_map(TrackEntry::track_id)
            .map(str::to_string)
            .collect()
    }

    /// Fetch features batch by batch, sequentially, keeping only present records
    pub fn collect_features<C>(
        catalog: &C,
        entries: &[TrackEntry],
    ) -> Result<Vec<AudioFeatures>, AnalysisError>
    where
        C: CatalogService + ?Sized,
    {
        let ids = Self::track_ids(entries);
        if ids.is_empty() {
            log::warn!("None of the {} entries has a catalog id", entries.len());
            return Err(AnalysisError::EmptyPlaylist);
        }

        let skipped = entries.len() - ids.len();
        if skipped > 0 {
            log::debug!("Skipping {skipped} local or unavailable entries");
        }

        let mut features = Vec::with_capacity(ids.len());
        for (index, batch) in ids.chunks(MAX_FEATURE_BATCH).enumerate() {
            log::debug!("Audio features batch {} ({} ids)", index + 1, batch.len());
            let records = catalog.get_audio_features(batch)?;
            features.extend(records.into_iter().flatten());
        }

        if features.is_empty() {
            log::warn!("No audio features returned for {} tracks", ids.len());
            return Err(AnalysisError::NoFeatures);
        }

        log::info!("Collected audio features for {}/{} tracks", features.len(), ids.len());
        Ok(features)
    }
}
