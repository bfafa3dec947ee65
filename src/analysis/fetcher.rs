use crate::client::CatalogService;
use crate::error::AnalysisError;
use crate::models::TrackEntry;
use serde::{Deserialize, Serialize};

/// Display metadata for the analyzed playlist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistInfo {
    pub id: String,
    pub name: String,
    pub image: Option<String>,
    /// Number of entries in the playlist, including ones that cannot be analyzed
    pub total_tracks: usize,
}

/// Playlist metadata together with every raw entry, across all pages
#[derive(Debug, Clone)]
pub struct FetchedPlaylist {
    pub info: PlaylistInfo,
    pub entries: Vec<TrackEntry>,
}

/// Retrieves playlist metadata and entries from the catalog
pub struct PlaylistFetcher;

impl PlaylistFetcher {
    pub fn fetch<C>(catalog: &C, playlist_id: &str) -> Result<FetchedPlaylist, AnalysisError>
    where
        C: CatalogService + ?Sized,
    {
        let playlist = catalog.get_playlist(playlist_id)?;
        let image = playlist.cover_image();

        let mut entries = playlist.tracks.items;
        let mut next = playlist.tracks.next;
        while let Some(url) = next {
            let page = catalog.get_tracks_page(&url)?;
            log::debug!("Fetched {} more entries for playlist {}", page.items.len(), playlist.id);
            entries.extend(page.items);
            next = page.next;
        }

        if entries.is_empty() {
            log::warn!("Playlist {} has no entries", playlist.id);
            return Err(AnalysisError::EmptyPlaylist);
        }

        log::info!("Fetched playlist '{}' with {} entries", playlist.name, entries.len());

        Ok(FetchedPlaylist {
            info: PlaylistInfo {
                id: playlist.id,
                name: playlist.name,
                image,
                total_tracks: entries.len(),
            },
            entries,
        })
    }
}
