use serde::{Deserialize, Serialize};

/// Full playlist object as returned by `GET /playlists/{id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub images: Option<Vec<Image>>,
    pub tracks: TracksPage,
}

/// Cover art entry; Spotify lists the largest first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Image {
    pub url: String,
    pub height: Option<u32>,
    pub width: Option<u32>,
}

/// One page of playlist entries
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TracksPage {
    #[serde(default)]
    pub items: Vec<TrackEntry>,
    pub next: Option<String>,
    pub total: Option<u32>,
}

/// A playlist entry. `track` is null when the track was removed from the catalog.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackEntry {
    pub track: Option<Track>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Track {
    pub id: Option<String>, // None for local files
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub artists: Vec<Artist>,
    #[serde(default)]
    pub is_local: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artist {
    pub id: Option<String>,
    pub name: String,
}

/// Per-track audio measurements. Everything except tempo and loudness is in [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioFeatures {
    pub id: Option<String>,
    pub tempo: f64, // BPM
    pub energy: f64,
    pub valence: f64,
    pub danceability: f64,
    pub acousticness: f64,
    pub instrumentalness: f64,
    pub speechiness: f64,
    pub loudness: f64, // dB, usually negative
}

/// Response structure for `GET /audio-features?ids=...`
#[derive(Debug, Deserialize)]
pub struct AudioFeaturesResponse {
    /// One slot per requested id, null where Spotify has no features
    pub audio_features: Vec<Option<AudioFeatures>>,
}

/// Body for `PUT /playlists/{id}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaylistUpdate {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UserProfile {
    pub id: String,
}

/// Response structure for `GET /me/playlists`
#[derive(Debug, Deserialize)]
pub struct UserPlaylistsPage {
    #[serde(default)]
    pub items: Vec<SimplifiedPlaylist>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimplifiedPlaylist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub images: Option<Vec<Image>>,
    pub owner: Owner,
    #[serde(default)]
    pub collaborative: bool,
    pub tracks: Option<TracksRef>,
    pub external_urls: Option<ExternalUrls>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Owner {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TracksRef {
    pub total: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExternalUrls {
    pub spotify: Option<String>,
}

/// Playlist row shown by the `list` command
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaylistSummary {
    pub id: String,
    pub name: String,
    pub image: Option<String>,
    pub total_tracks: u32,
    pub url: Option<String>,
}

/// Response structure for `GET /recommendations`
#[derive(Debug, Deserialize)]
pub struct RecommendationsResponse {
    #[serde(default)]
    pub tracks: Vec<Track>,
}

/// Response structure for `GET /search?type=track`
#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    pub tracks: SearchTracks,
}

#[derive(Debug, Deserialize)]
pub struct SearchTracks {
    #[serde(default)]
    pub items: Vec<Track>,
}

/// Response structure for the accounts token endpoint
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: u64, // seconds
}

fn first_image(images: &Option<Vec<Image>>) -> Option<String> {
    images
        .as_ref()
        .and_then(|images| images.first())
        .map(|image| image.url.clone())
}

impl Playlist {
    pub fn cover_image(&self) -> Option<String> {
        first_image(&self.images)
    }
}

impl TrackEntry {
    /// Catalog id of this entry, if it points at a track that can be analyzed
    pub fn track_id(&self) -> Option<&str> {
        self.track
            .as_ref()
            .and_then(|track| track.id.as_deref())
            .filter(|id| !id.is_empty())
    }
}

impl Track {
    pub fn artist_names(&self) -> String {
        self.artists
            .iter()
            .map(|artist| artist.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl SimplifiedPlaylist {
    /// Whether the given user may rename this playlist
    pub fn is_editable_by(&self, user_id: &str) -> bool {
        self.owner.id == user_id || self.collaborative
    }

    pub fn summary(&self) -> PlaylistSummary {
        PlaylistSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            image: first_image(&self.images),
            total_tracks: self.tracks.as_ref().map(|t| t.total).unwrap_or(0),
            url: self.external_urls.as_ref().and_then(|u| u.spotify.clone()),
        }
    }
}
