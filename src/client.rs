use crate::error::{AnalysisError, upstream_error};
use crate::models::{
    AudioFeatures, AudioFeaturesResponse, Playlist, PlaylistSummary, PlaylistUpdate,
    RecommendationsResponse, SearchResponse, SimplifiedPlaylist, Track, TracksPage,
    UserPlaylistsPage, UserProfile,
};
use crate::recommend::TuningTargets;
use crate::token::CredentialProvider;
use serde::de::DeserializeOwned;
use ureq::Agent;
use urlencoding::encode;

#[cfg(test)]
use mockall::automock;

/// Upper bound on ids per audio-features lookup imposed by the Web API
pub const MAX_FEATURE_BATCH: usize = 100;

/// Catalog ids are 22 base62 characters
const SPOTIFY_ID_LEN: usize = 22;

/// The catalog operations the analysis and recommendation code rely on
#[cfg_attr(test, automock)]
pub trait CatalogService {
    /// Playlist metadata plus the first page of entries
    fn get_playlist(&self, playlist_id: &str) -> Result<Playlist, AnalysisError>;

    /// Follow a `next` link from a previous page
    fn get_tracks_page(&self, next_url: &str) -> Result<TracksPage, AnalysisError>;

    /// One slot per id, in request order; `None` where no features exist
    fn get_audio_features(
        &self,
        track_ids: &[String],
    ) -> Result<Vec<Option<AudioFeatures>>, AnalysisError>;

    fn rename_playlist(
        &self,
        playlist_id: &str,
        update: &PlaylistUpdate,
    ) -> Result<(), AnalysisError>;

    fn get_track(&self, track_id: &str) -> Result<Track, AnalysisError>;

    fn search_tracks(&self, query: &str) -> Result<Vec<Track>, AnalysisError>;

    fn get_recommendations(
        &self,
        seed_track_id: &str,
        targets: &TuningTargets,
        limit: u32,
    ) -> Result<Vec<Track>, AnalysisError>;
}

/// Spotify Web API client authenticated with a bearer token
pub struct SpotifyClient {
    agent: Agent,
    api_base: String,
    credentials: Box<dyn CredentialProvider>,
}

impl SpotifyClient {
    pub fn new(
        agent: Agent,
        api_base: impl Into<String>,
        credentials: Box<dyn CredentialProvider>,
    ) -> Self {
        SpotifyClient {
            agent,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            credentials,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path.trim_start_matches('/'))
    }

    fn bearer(&self) -> Result<String, AnalysisError> {
        Ok(format!("Bearer {}", self.credentials.access_token()?))
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str, context: &str) -> Result<T, AnalysisError> {
        log::debug!("GET {url}");
        self.agent
            .get(url)
            .set("Authorization", &self.bearer()?)
            .call()
            .map_err(|e| upstream_error(context, e))?
            .into_json()
            .map_err(|e| AnalysisError::upstream(format!("{context}: invalid response: {e}")))
    }

    fn audio_features_url(&self, track_ids: &[String]) -> String {
        let ids: Vec<String> = track_ids.iter().map(|id| encode(id).into_owned()).collect();
        self.url(&format!("audio-features?ids={}", ids.join(",")))
    }

    fn recommendations_url(&self, seed_track_id: &str, targets: &TuningTargets, limit: u32) -> String {
        let mut url = self.url(&format!(
            "recommendations?seed_tracks={}&limit={}",
            encode(seed_track_id),
            limit
        ));
        for (key, value) in targets.query_params() {
            url.push_str(&format!("&{key}={value}"));
        }
        url
    }

    /// Id of the user the token belongs to
    pub fn current_user_id(&self) -> Result<String, AnalysisError> {
        let profile: UserProfile = self.get_json(&self.url("me"), "get current user")?;
        Ok(profile.id)
    }

    /// The user's playlists that they own or collaborate on
    pub fn editable_playlists(&self) -> Result<Vec<PlaylistSummary>, AnalysisError> {
        let page: UserPlaylistsPage =
            self.get_json(&self.url("me/playlists?limit=50"), "list playlists")?;
        let user_id = self.current_user_id()?;

        Ok(page
            .items
            .iter()
            .filter(|p| p.is_editable_by(&user_id))
            .map(SimplifiedPlaylist::summary)
            .collect())
    }
}

impl CatalogService for SpotifyClient {
    fn get_playlist(&self, playlist_id: &str) -> Result<Playlist, AnalysisError> {
        let url = self.url(&format!("playlists/{}", encode(playlist_id)));
        self.get_json(&url, "get playlist")
    }

    fn get_tracks_page(&self, next_url: &str) -> Result<TracksPage, AnalysisError> {
        // The bearer token only goes to our own API base
        if !next_url.starts_with(&format!("{}/", self.api_base)) {
            return Err(AnalysisError::upstream(format!(
                "get playlist tracks: next link {next_url} is outside {}",
                self.api_base
            )));
        }
        self.get_json(next_url, "get playlist tracks")
    }

    fn get_audio_features(
        &self,
        track_ids: &[String],
    ) -> Result<Vec<Option<AudioFeatures>>, AnalysisError> {
        if track_ids.is_empty() {
            return Ok(Vec::new());
        }
        if track_ids.len() > MAX_FEATURE_BATCH {
            return Err(AnalysisError::upstream(format!(
                "audio features accept at most {MAX_FEATURE_BATCH} ids, got {}",
                track_ids.len()
            )));
        }

        let response: AudioFeaturesResponse =
            self.get_json(&self.audio_features_url(track_ids), "get audio features")?;
        Ok(response.audio_features)
    }

    fn rename_playlist(
        &self,
        playlist_id: &str,
        update: &PlaylistUpdate,
    ) -> Result<(), AnalysisError> {
        let url = self.url(&format!("playlists/{}", encode(playlist_id)));
        log::debug!("PUT {url}");

        self.agent
            .put(&url)
            .set("Authorization", &self.bearer()?)
            .send_json(update)
            .map_err(|e| upstream_error("rename playlist", e))?;

        log::info!("Renamed playlist {playlist_id} to '{}'", update.name);
        Ok(())
    }

    fn get_track(&self, track_id: &str) -> Result<Track, AnalysisError> {
        let url = self.url(&format!("tracks/{}", encode(track_id)));
        self.get_json(&url, "get track")
    }

    fn search_tracks(&self, query: &str) -> Result<Vec<Track>, AnalysisError> {
        let url = self.url(&format!("search?q={}&type=track", encode(query)));
        let response: SearchResponse = self.get_json(&url, "search tracks")?;
        Ok(response.tracks.items)
    }

    fn get_recommendations(
        &self,
        seed_track_id: &str,
        targets: &TuningTargets,
        limit: u32,
    ) -> Result<Vec<Track>, AnalysisError> {
        let url = self.recommendations_url(seed_track_id, targets, limit);
        let response: RecommendationsResponse = self.get_json(&url, "get recommendations")?;
        Ok(response.tracks)
    }
}

/// Pull a catalog id out of an open.spotify.com URL, a `spotify:` URI or a bare id.
/// `kind` is the path segment, e.g. "playlist" or "track".
pub fn extract_spotify_id(input: &str, kind: &str) -> Option<String> {
    let input = input.trim();
    let url_marker = format!("spotify.com/{kind}/");
    let uri_marker = format!("spotify:{kind}:");

    let candidate = if let Some(pos) = input.find(&url_marker) {
        &input[pos + url_marker.len()..]
    } else if let Some(pos) = input.find(&uri_marker) {
        &input[pos + uri_marker.len()..]
    } else {
        input
    };

    let id: String = candidate
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect();

    // A bare input must be nothing but a full-length id
    let bare = candidate.len() == input.len();
    if id.is_empty() || (bare && (id.len() != input.len() || id.len() != SPOTIFY_ID_LEN)) {
        None
    } else {
        Some(id)
    }
}
