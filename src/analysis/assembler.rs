use super::{AggregateVector, FeatureBatcher, PlaylistFetcher, PlaylistInfo, VibeClassifier, VibeLabel};
use crate::client::CatalogService;
use crate::error::AnalysisError;
use crate::models::PlaylistUpdate;
use crate::naming::{NameGenerator, NamingRequest};
use crate::store::AnalysisStore;
use serde::Serialize;

/// Output of the deterministic part of the pipeline
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistAnalysis {
    #[serde(rename = "playlistInfo")]
    pub playlist: PlaylistInfo,
    pub aggregate_vector: AggregateVector,
    pub vibe_label: VibeLabel,
}

/// A finished analysis. Built once, never modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub playlist_info: PlaylistInfo,
    pub aggregate_vector: AggregateVector,
    pub vibe_label: VibeLabel,
    pub generated_names: Vec<String>,
}

impl AnalysisResult {
    pub fn assemble(analysis: PlaylistAnalysis, generated_names: Vec<String>) -> Self {
        AnalysisResult {
            playlist_info: analysis.playlist,
            aggregate_vector: analysis.aggregate_vector,
            vibe_label: analysis.vibe_label,
            generated_names,
        }
    }
}

/// Fetch -> batch -> aggregate -> classify for one playlist
pub struct PlaylistAnalyzer<'a, C: ?Sized> {
    catalog: &'a C,
}

impl<'a, C: CatalogService + ?Sized> PlaylistAnalyzer<'a, C> {
    pub fn new(catalog: &'a C) -> Self {
        Self { catalog }
    }

    pub fn analyze(&self, playlist_id: &str) -> Result<PlaylistAnalysis, AnalysisError> {
        let fetched = PlaylistFetcher::fetch(self.catalog, playlist_id)?;
        let features = FeatureBatcher::collect_features(self.catalog, &fetched.entries)?;
        let aggregate_vector = AggregateVector::from_features(&features)?;
        let vibe_label = VibeClassifier::classify(&aggregate_vector);

        log::info!(
            "Playlist '{}' classified as '{}' from {} tracks",
            fetched.info.name,
            vibe_label,
            aggregate_vector.track_count
        );

        Ok(PlaylistAnalysis {
            playlist: fetched.info,
            aggregate_vector,
            vibe_label,
        })
    }
}

/// Full request: analysis, name proposals and (optionally) persistence.
/// Either returns a complete result or fails with exactly one error.
pub struct VibeNamer<'a, C: ?Sized, N: ?Sized> {
    catalog: &'a C,
    namer: &'a N,
    store: Option<&'a AnalysisStore>,
}

impl<'a, C, N> VibeNamer<'a, C, N>
where
    C: CatalogService + ?Sized,
    N: NameGenerator + ?Sized,
{
    /// Without a store the result is computed but not recorded
    pub fn new(catalog: &'a C, namer: &'a N, store: Option<&'a AnalysisStore>) -> Self {
        Self {
            catalog,
            namer,
            store,
        }
    }

    pub fn run(&self, playlist_id: &str) -> Result<AnalysisResult, AnalysisError> {
        let analysis = PlaylistAnalyzer::new(self.catalog).analyze(playlist_id)?;

        log::info!("Generating names for vibe: {}", analysis.vibe_label);
        let names = self
            .namer
            .propose_names(&NamingRequest::from(&analysis))
            .map_err(|e| match e {
                AnalysisError::Generation(_) => e,
                other => AnalysisError::Generation(other.to_string()),
            })?;

        let result = AnalysisResult::assemble(analysis, names);

        if let Some(store) = self.store {
            let row_id = store.record(&result)?;
            log::debug!("Stored analysis of {} as row {row_id}", result.playlist_info.id);
        }

        Ok(result)
    }
}

/// Description written alongside a new playlist name
pub fn rename_description(vibe_label: Option<&str>) -> String {
    format!(
        "Curated mathematically by Mood Muse. Vibe detected: {}",
        vibe_label.unwrap_or("Unknown")
    )
}

/// The new playlist name, trimmed. Blank names are rejected.
pub fn validate_name(new_name: &str) -> Result<&str, AnalysisError> {
    let name = new_name.trim();
    if name.is_empty() {
        return Err(AnalysisError::InvalidRequest("newName is required".to_string()));
    }
    Ok(name)
}

/// Write a chosen name back to the catalog
pub fn write_back<C>(
    catalog: &C,
    playlist_id: &str,
    new_name: &str,
    vibe_label: Option<&str>,
) -> Result<PlaylistUpdate, AnalysisError>
where
    C: CatalogService + ?Sized,
{
    let update = PlaylistUpdate {
        name: validate_name(new_name)?.to_string(),
        description: Some(rename_description(vibe_label)),
    };
    catalog.rename_playlist(playlist_id, &update)?;
    Ok(update)
}
