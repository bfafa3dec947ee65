use crate::error::AnalysisError;
use crate::models::AudioFeatures;
use serde::{Deserialize, Serialize};

/// Mean audio features across every track that had feature data.
///
/// Values are kept at full precision; rounding happens only when displayed.
/// Serialized field names match the stored JSON (`avgTempo`, ..., `trackCount`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateVector {
    pub avg_tempo: f64,
    pub avg_energy: f64,
    pub avg_valence: f64,
    pub avg_danceability: f64,
    pub avg_acousticness: f64,
    pub avg_instrumentalness: f64,
    pub avg_speechiness: f64,
    pub avg_loudness: f64,
    /// Records actually averaged, not the playlist length
    pub track_count: usize,
}

impl AggregateVector {
    pub fn from_features(features: &[AudioFeatures]) -> Result<Self, AnalysisError> {
        if features.is_empty() {
            return Err(AnalysisError::NoFeatures);
        }

        let mut totals = [0.0_f64; 8];
        for f in features {
            totals[0] += f.tempo;
            totals[1] += f.energy;
            totals[2] += f.valence;
            totals[3] += f.danceability;
            totals[4] += f.acousticness;
            totals[5] += f.instrumentalness;
            totals[6] += f.speechiness;
            totals[7] += f.loudness;
        }

        let count = features.len();
        let [tempo, energy, valence, danceability, acousticness, instrumentalness, speechiness, loudness] =
            totals.map(|total| total / count as f64);

        Ok(AggregateVector {
            avg_tempo: tempo,
            avg_energy: energy,
            avg_valence: valence,
            avg_danceability: danceability,
            avg_acousticness: acousticness,
            avg_instrumentalness: instrumentalness,
            avg_speechiness: speechiness,
            avg_loudness: loudness,
            track_count: count,
        })
    }
}
