use crate::client::{CatalogService, extract_spotify_id};
use crate::error::AnalysisError;
use crate::models::Track;
use rand::Rng;
use serde::Serialize;

pub const RECOMMENDATION_LIMIT: u32 = 24;

/// Target audio features sent to the catalog's recommendation endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TuningTargets {
    pub energy: f64,
    pub valence: f64,
    pub acousticness: f64,
    pub danceability: f64,
    pub popularity: u32,
}

impl TuningTargets {
    /// Derive targets from the UI-style sliders.
    /// `chaos` and `underground` are 0-100, 50 is neutral.
    pub fn from_sliders(chaos: u32, underground: u32, villain: bool, feminine: bool) -> Self {
        let mut energy = 0.5;
        let mut valence = 0.5;
        let mut acousticness = 0.5;
        let mut danceability = 0.5;
        let mut popularity = 50;

        if chaos > 50 {
            let boost = (chaos - 50) as f64 / 100.0;
            energy += boost;
            danceability += boost;
        }

        if underground > 50 {
            popularity = 50u32.saturating_sub(underground - 50);
        }

        if villain {
            valence -= 0.3;
            energy += 0.2;
        }

        if feminine {
            acousticness += 0.2;
            valence += 0.1;
        }

        TuningTargets {
            energy: clamp_unit(energy),
            valence: clamp_unit(valence),
            acousticness: clamp_unit(acousticness),
            danceability: clamp_unit(danceability),
            popularity,
        }
    }

    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("target_energy", format!("{:.2}", self.energy)),
            ("target_valence", format!("{:.2}", self.valence)),
            ("target_acousticness", format!("{:.2}", self.acousticness)),
            ("target_danceability", format!("{:.2}", self.danceability)),
            ("target_popularity", self.popularity.to_string()),
        ]
    }
}

fn clamp_unit(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

/// What the user asked for
#[derive(Debug, Clone)]
pub struct RecommendationRequest {
    pub seed_track_id: String,
    pub targets: TuningTargets,
    pub tag: &'static str,
}

impl RecommendationRequest {
    pub fn new(
        seed_track_id: impl Into<String>,
        chaos: u32,
        underground: u32,
        villain: bool,
        feminine: bool,
    ) -> Self {
        let tag = if villain {
            "villain arc"
        } else if feminine {
            "ethereal"
        } else {
            "main character"
        };

        RecommendationRequest {
            seed_track_id: seed_track_id.into(),
            targets: TuningTargets::from_sliders(chaos, underground, villain, feminine),
            tag,
        }
    }
}

/// A suggested track ready for display
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub id: String,
    pub name: String,
    pub artist: String,
    /// Display-only match percentage
    pub similarity: u8,
    pub tag: &'static str,
}

fn to_recommendations(
    tracks: Vec<Track>,
    tag: &'static str,
    similarity: std::ops::Range<u8>,
) -> Vec<Recommendation> {
    let mut rng = rand::thread_rng();
    tracks
        .into_iter()
        .filter_map(|track| {
            let artist = track.artist_names();
            let id = track.id?;
            Some(Recommendation {
                id,
                name: track.name,
                artist,
                similarity: rng.gen_range(similarity.clone()),
                tag,
            })
        })
        .collect()
}

/// Track id for a seed given as an id, URL, URI or free text.
/// Free text resolves to the first search hit that has an id.
pub fn resolve_seed_track(
    catalog: &dyn CatalogService,
    input: &str,
) -> Result<String, AnalysisError> {
    if let Some(id) = extract_spotify_id(input, "track") {
        return Ok(id);
    }

    let query = input.trim();
    let not_found = || AnalysisError::Upstream {
        status: Some(404),
        message: format!("search tracks: nothing matches '{query}'"),
    };
    if query.is_empty() {
        return Err(not_found());
    }

    log::debug!("Searching for seed track '{query}'");
    let hit = catalog
        .search_tracks(query)?
        .into_iter()
        .find(|track| track.id.is_some())
        .ok_or_else(not_found)?;

    log::info!("Using '{}' by {} as seed", hit.name, hit.artist_names());
    hit.id.ok_or_else(not_found)
}

/// One way of producing recommendations for a seed track
pub trait RecommendationSource {
    fn name(&self) -> &'static str;

    fn recommend(
        &self,
        catalog: &dyn CatalogService,
        request: &RecommendationRequest,
    ) -> Result<Vec<Recommendation>, AnalysisError>;
}

/// The catalog's own seed-based recommendations
pub struct SeedRecommendations {
    pub limit: u32,
}

impl Default for SeedRecommendations {
    fn default() -> Self {
        SeedRecommendations {
            limit: RECOMMENDATION_LIMIT,
        }
    }
}

impl RecommendationSource for SeedRecommendations {
    fn name(&self) -> &'static str {
        "seed recommendations"
    }

    fn recommend(
        &self,
        catalog: &dyn CatalogService,
        request: &RecommendationRequest,
    ) -> Result<Vec<Recommendation>, AnalysisError> {
        let tracks =
            catalog.get_recommendations(&request.seed_track_id, &request.targets, self.limit)?;
        Ok(to_recommendations(tracks, request.tag, 85..100))
    }
}

/// Other tracks by the seed track's first artist
pub struct ArtistSearchFallback;

impl RecommendationSource for ArtistSearchFallback {
    fn name(&self) -> &'static str {
        "artist search"
    }

    fn recommend(
        &self,
        catalog: &dyn CatalogService,
        request: &RecommendationRequest,
    ) -> Result<Vec<Recommendation>, AnalysisError> {
        let seed = catalog.get_track(&request.seed_track_id)?;
        let artist = seed.artists.first().ok_or_else(|| {
            AnalysisError::upstream(format!("track {} has no artists", request.seed_track_id))
        })?;

        let tracks = catalog.search_tracks(&format!("artist:{}", artist.name))?;
        Ok(to_recommendations(tracks, request.tag, 70..85))
    }
}

/// Recommendations plus the name of the source that produced them
#[derive(Debug)]
pub struct RecommendationOutcome {
    pub source: &'static str,
    pub tracks: Vec<Recommendation>,
}

/// Primary source first, then the named fallback if the primary fails
pub struct RecommendationStrategy<P, F> {
    primary: P,
    fallback: F,
}

impl<P: RecommendationSource, F: RecommendationSource> RecommendationStrategy<P, F> {
    pub fn new(primary: P, fallback: F) -> Self {
        RecommendationStrategy { primary, fallback }
    }

    pub fn recommend(
        &self,
        catalog: &dyn CatalogService,
        request: &RecommendationRequest,
    ) -> Result<RecommendationOutcome, AnalysisError> {
        match self.primary.recommend(catalog, request) {
            Ok(tracks) => {
                return Ok(RecommendationOutcome {
                    source: self.primary.name(),
                    tracks,
                });
            }
            Err(e) => log::warn!(
                "{} failed ({e}), trying {}",
                self.primary.name(),
                self.fallback.name()
            ),
        }

        let tracks = self.fallback.recommend(catalog, request)?;
        Ok(RecommendationOutcome {
            source: self.fallback.name(),
            tracks,
        })
    }
}

impl Default for RecommendationStrategy<SeedRecommendations, ArtistSearchFallback> {
    fn default() -> Self {
        RecommendationStrategy::new(SeedRecommendations::default(), ArtistSearchFallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockCatalogService;
    use crate::models::Artist;
    use approx::assert_relative_eq;

    fn track(id: &str, name: &str, artist: &str) -> Track {
        Track {
            id: Some(id.to_string()),
            name: name.to_string(),
            artists: vec![Artist {
                id: None,
                name: artist.to_string(),
            }],
            is_local: false,
        }
    }

    fn deprecated_endpoint() -> AnalysisError {
        AnalysisError::Upstream {
            status: Some(404),
            message: "get recommendations: endpoint removed".to_string(),
        }
    }

    #[test]
    fn test_neutral_sliders() {
        let targets = TuningTargets::from_sliders(50, 50, false, false);
        assert_eq!(
            targets,
            TuningTargets {
                energy: 0.5,
                valence: 0.5,
                acousticness: 0.5,
                danceability: 0.5,
                popularity: 50,
            }
        );
    }

    #[test]
    fn test_slider_modifiers() {
        let targets = TuningTargets::from_sliders(80, 90, true, false);
        assert_relative_eq!(targets.energy, 1.0); // 0.5 + 0.3 + 0.2
        assert_relative_eq!(targets.danceability, 0.8, epsilon = 1e-9);
        assert_relative_eq!(targets.valence, 0.2, epsilon = 1e-9);
        assert_eq!(targets.popularity, 10);

        let targets = TuningTargets::from_sliders(0, 100, false, true);
        assert_relative_eq!(targets.acousticness, 0.7, epsilon = 1e-9);
        assert_relative_eq!(targets.valence, 0.6, epsilon = 1e-9);
        assert_relative_eq!(targets.energy, 0.5);
        assert_eq!(targets.popularity, 0);
    }

    #[test]
    fn test_targets_are_clamped() {
        let targets = TuningTargets::from_sliders(100, 0, true, true);
        assert_relative_eq!(targets.energy, 1.0);
        assert!(targets.valence >= 0.0 && targets.valence <= 1.0);
        assert_relative_eq!(targets.danceability, 1.0);
    }

    #[test]
    fn test_request_tag_prefers_villain() {
        assert_eq!(RecommendationRequest::new("s", 50, 50, true, true).tag, "villain arc");
        assert_eq!(RecommendationRequest::new("s", 50, 50, false, true).tag, "ethereal");
        assert_eq!(
            RecommendationRequest::new("s", 50, 50, false, false).tag,
            "main character"
        );
    }

    #[test]
    fn test_primary_success_skips_fallback() {
        let mut catalog = MockCatalogService::new();
        catalog
            .expect_get_recommendations()
            .withf(|seed, _, limit| seed == "seed1" && *limit == RECOMMENDATION_LIMIT)
            .times(1)
            .returning(|_, _, _| Ok(vec![track("r1", "Rec One", "Band"), track("r2", "Rec Two", "Band")]));
        catalog.expect_get_track().never();
        catalog.expect_search_tracks().never();

        let request = RecommendationRequest::new("seed1", 50, 50, false, false);
        let outcome = RecommendationStrategy::default()
            .recommend(&catalog, &request)
            .unwrap();

        assert_eq!(outcome.source, "seed recommendations");
        assert_eq!(outcome.tracks.len(), 2);
        assert!(outcome.tracks.iter().all(|t| (85..100).contains(&t.similarity)));
        assert!(outcome.tracks.iter().all(|t| t.tag == "main character"));
    }

    #[test]
    fn test_fallback_searches_seed_artist() {
        let mut catalog = MockCatalogService::new();
        catalog
            .expect_get_recommendations()
            .times(1)
            .returning(|_, _, _| Err(deprecated_endpoint()));
        catalog
            .expect_get_track()
            .withf(|id| id == "seed1")
            .times(1)
            .returning(|_| Ok(track("seed1", "Seed", "Phoebe Bridgers")));
        catalog
            .expect_search_tracks()
            .withf(|query| query == "artist:Phoebe Bridgers")
            .times(1)
            .returning(|_| {
                Ok(vec![
                    track("f1", "Motion Sickness", "Phoebe Bridgers"),
                    Track {
                        id: None,
                        ..track("local", "Local", "Phoebe Bridgers")
                    },
                ])
            });

        let request = RecommendationRequest::new("seed1", 50, 50, true, false);
        let outcome = RecommendationStrategy::default()
            .recommend(&catalog, &request)
            .unwrap();

        assert_eq!(outcome.source, "artist search");
        assert_eq!(outcome.tracks.len(), 1);
        assert_eq!(outcome.tracks[0].name, "Motion Sickness");
        assert_eq!(outcome.tracks[0].tag, "villain arc");
        assert!((70..85).contains(&outcome.tracks[0].similarity));
    }

    #[test]
    fn test_both_sources_failing_returns_fallback_error() {
        let mut catalog = MockCatalogService::new();
        catalog
            .expect_get_recommendations()
            .returning(|_, _, _| Err(deprecated_endpoint()));
        catalog.expect_get_track().returning(|_| {
            Err(AnalysisError::Upstream {
                status: Some(401),
                message: "get track: token expired".to_string(),
            })
        });

        let request = RecommendationRequest::new("seed1", 50, 50, false, false);
        let err = RecommendationStrategy::default()
            .recommend(&catalog, &request)
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Upstream { status: Some(401), .. }));
    }

    #[test]
    fn test_fallback_alone_rejects_seed_without_artist() {
        let mut catalog = MockCatalogService::new();
        catalog.expect_get_track().returning(|_| {
            Ok(Track {
                id: Some("seed1".to_string()),
                name: "Mystery".to_string(),
                artists: vec![],
                is_local: false,
            })
        });
        catalog.expect_search_tracks().never();

        let request = RecommendationRequest::new("seed1", 50, 50, false, false);
        assert!(ArtistSearchFallback.recommend(&catalog, &request).is_err());
    }

    #[test]
    fn test_seed_url_skips_search() {
        let mut catalog = MockCatalogService::new();
        catalog.expect_search_tracks().never();

        let id = resolve_seed_track(
            &catalog,
            "https://open.spotify.com/track/4uLU6hMCjMI75M1A2tKUQC?si=x",
        )
        .unwrap();
        assert_eq!(id, "4uLU6hMCjMI75M1A2tKUQC");
    }

    #[test]
    fn test_free_text_seed_uses_first_search_hit() {
        let mut catalog = MockCatalogService::new();
        catalog
            .expect_search_tracks()
            .withf(|query| query == "Motion Sickness Phoebe Bridgers")
            .times(1)
            .returning(|_| {
                Ok(vec![
                    Track {
                        id: None,
                        name: "Motion Sickness (demo)".to_string(),
                        artists: vec![],
                        is_local: true,
                    },
                    track("5xo8RrjJ9CVNrtRg2S3B1R", "Motion Sickness", "Phoebe Bridgers"),
                    track("other", "Kyoto", "Phoebe Bridgers"),
                ])
            });

        let id = resolve_seed_track(&catalog, "  Motion Sickness Phoebe Bridgers ").unwrap();
        assert_eq!(id, "5xo8RrjJ9CVNrtRg2S3B1R");
    }

    #[test]
    fn test_free_text_seed_without_hits_is_not_found() {
        let mut catalog = MockCatalogService::new();
        catalog
            .expect_search_tracks()
            .times(1)
            .returning(|_| Ok(vec![]));

        let err = resolve_seed_track(&catalog, "zzqx no such song").unwrap_err();
        assert!(matches!(err, AnalysisError::Upstream { status: Some(404), .. }));
        assert_eq!(err.user_message(), "Not found on Spotify.");
    }

    #[test]
    fn test_blank_seed_never_searches() {
        let mut catalog = MockCatalogService::new();
        catalog.expect_search_tracks().never();

        assert!(resolve_seed_track(&catalog, "   ").is_err());
    }
}
