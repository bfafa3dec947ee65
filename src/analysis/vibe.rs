use super::AggregateVector;
use serde::{Serialize, Serializer};
use std::fmt;

/// The fixed set of vibe tags a playlist can be classified into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VibeLabel {
    RageGym,
    VillainArc,
    ClubBasement,
    LateNight,
    AcousticCottagecore,
    SoftGirl,
    PodcastBrain,
    NightDrive,
    HotGirlSummer,
    NeutralChill,
}

impl VibeLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            VibeLabel::RageGym => "Rage Gym / Main Character Energy",
            VibeLabel::VillainArc => "Villain Arc / Dark Moody",
            VibeLabel::ClubBasement => "Club Basement / High Danceability",
            VibeLabel::LateNight => "Late Night / Sad Autumn",
            VibeLabel::AcousticCottagecore => "Acoustic Cottagecore / Lo-Fi Study",
            VibeLabel::SoftGirl => "Soft Girl / Relaxed Sunday",
            VibeLabel::PodcastBrain => "Podcast Brain / Spoken Word",
            VibeLabel::NightDrive => "Night Drive Cinematic / Road Trip",
            VibeLabel::HotGirlSummer => "Hot Girl Summer / Party Mode",
            VibeLabel::NeutralChill => "Neutral Vibes / Chill Blend",
        }
    }
}

impl fmt::Display for VibeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for VibeLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A threshold predicate on the mean vector and the label it selects
pub struct VibeRule {
    pub label: VibeLabel,
    pub matches: fn(&AggregateVector) -> bool,
}

/// Evaluated top to bottom; the first match wins. Predicates overlap, so the
/// order is the tie-break. All comparisons are strict.
pub const VIBE_RULES: &[VibeRule] = &[
    VibeRule {
        label: VibeLabel::RageGym,
        matches: |v| v.avg_energy > 0.8 && v.avg_valence > 0.6,
    },
    VibeRule {
        label: VibeLabel::VillainArc,
        matches: |v| v.avg_energy > 0.6 && v.avg_valence < 0.4,
    },
    VibeRule {
        label: VibeLabel::ClubBasement,
        matches: |v| v.avg_danceability > 0.7 && v.avg_tempo > 110.0,
    },
    VibeRule {
        label: VibeLabel::LateNight,
        matches: |v| v.avg_energy < 0.4 && v.avg_valence < 0.4,
    },
    VibeRule {
        label: VibeLabel::AcousticCottagecore,
        matches: |v| v.avg_acousticness > 0.6 && v.avg_energy < 0.5,
    },
    VibeRule {
        label: VibeLabel::SoftGirl,
        matches: |v| v.avg_energy < 0.5 && v.avg_valence > 0.6,
    },
    VibeRule {
        label: VibeLabel::PodcastBrain,
        matches: |v| v.avg_speechiness > 0.6,
    },
    VibeRule {
        label: VibeLabel::NightDrive,
        matches: |v| v.avg_tempo > 130.0 && v.avg_energy > 0.5,
    },
    VibeRule {
        label: VibeLabel::HotGirlSummer,
        matches: |v| v.avg_danceability > 0.65 && v.avg_valence > 0.6,
    },
];

pub const DEFAULT_VIBE: VibeLabel = VibeLabel::NeutralChill;

/// Rule-based classification of an aggregate vector
pub struct VibeClassifier;

impl VibeClassifier {
    pub fn classify(vector: &AggregateVector) -> VibeLabel {
        VIBE_RULES
            .iter()
            .find(|rule| (rule.matches)(vector))
            .map(|rule| rule.label)
            .unwrap_or(DEFAULT_VIBE)
    }
}
