use crate::analysis::{AggregateVector, PlaylistAnalysis, VibeLabel};
use crate::error::AnalysisError;
use serde::Deserialize;
use serde_json::json;
use ureq::Agent;

#[cfg(test)]
use mockall::automock;

/// Number of candidate names every proposal must contain
pub const NAME_COUNT: usize = 5;

const SYSTEM_INSTRUCTION: &str =
    "You are a Gen-Z music culture expert. You create highly creative, non-generic playlist names.";

/// Everything the text generator gets to see about a playlist
#[derive(Debug, Clone, PartialEq)]
pub struct NamingRequest {
    pub playlist_name: String,
    /// Nominal playlist length, not the number of analyzed tracks
    pub track_count: usize,
    pub vector: AggregateVector,
    pub vibe_label: VibeLabel,
}

impl From<&PlaylistAnalysis> for NamingRequest {
    fn from(analysis: &PlaylistAnalysis) -> Self {
        NamingRequest {
            playlist_name: analysis.playlist.name.clone(),
            track_count: analysis.playlist.total_tracks,
            vector: analysis.aggregate_vector.clone(),
            vibe_label: analysis.vibe_label,
        }
    }
}

/// Proposes new playlist names from an analysis
#[cfg_attr(test, automock)]
pub trait NameGenerator {
    /// Exactly [`NAME_COUNT`] multi-word names, or a `Generation` error
    fn propose_names(&self, request: &NamingRequest) -> Result<Vec<String>, AnalysisError>;
}

/// Gemini `generateContent` backed name generator
pub struct GeminiNamer {
    agent: Agent,
    api_base: String,
    model: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

impl GenerateContentResponse {
    fn into_text(self) -> Option<String> {
        let text: String = self
            .candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .filter_map(|part| part.text)
            .collect();
        if text.trim().is_empty() { None } else { Some(text) }
    }
}

impl GeminiNamer {
    pub fn new(
        agent: Agent,
        api_base: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        GeminiNamer {
            agent,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.api_base, self.model)
    }
}

impl NameGenerator for GeminiNamer {
    fn propose_names(&self, request: &NamingRequest) -> Result<Vec<String>, AnalysisError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AnalysisError::Generation("Missing Gemini API key".to_string()))?;

        let body = json!({
            "systemInstruction": { "parts": [{ "text": SYSTEM_INSTRUCTION }] },
            "contents": [{ "role": "user", "parts": [{ "text": build_prompt(request) }] }],
            "generationConfig": { "responseMimeType": "application/json" }
        });

        log::debug!("Requesting names from {} for '{}'", self.model, request.playlist_name);

        // Key goes in a header so it never ends up in an error message
        let response: GenerateContentResponse = self
            .agent
            .post(&self.endpoint())
            .set("x-goog-api-key", api_key)
            .send_json(body)
            .map_err(|e| match e {
                ureq::Error::Status(code, response) => AnalysisError::Generation(format!(
                    "HTTP {code}: {}",
                    response.into_string().unwrap_or_default()
                )),
                ureq::Error::Transport(t) => AnalysisError::Generation(t.to_string()),
            })?
            .into_json()
            .map_err(|e| AnalysisError::Generation(format!("unreadable response: {e}")))?;

        let text = response
            .into_text()
            .ok_or_else(|| AnalysisError::Generation("response contained no text".to_string()))?;

        parse_candidates(&text, &request.playlist_name)
    }
}

/// Prompt describing the playlist's measured profile
pub fn build_prompt(request: &NamingRequest) -> String {
    let v = &request.vector;
    format!(
        r#"I have a Spotify playlist currently named "{name}" with {count} tracks.
I just mathematically analyzed the audio features of every track, and here are the results:
- Average Tempo: {tempo:.0} BPM
- Average Energy: {energy:.2} (0 is low, 1 is high)
- Average Valence (Happiness): {valence:.2} (0 is sad, 1 is happy)
- Average Danceability: {dance:.2}
- Average Acousticness: {acoustic:.2}
- Average Instrumentalness: {instrumental:.2}
- Average Speechiness: {speech:.2}
- Average Loudness: {loudness:.1} dB
- Autodetected Deterministic Vibe Cluster: "{label}"

Based ONLY on this strict mathematical profile and the vibe cluster, generate exactly {n} culturally intelligent, Gen-Z coded playlist names.
Do NOT just repeat the original name.
Make them at least 3-4 words.
Provide a mix of lowercase, aesthetic, and bold styles.

Return ONLY a valid JSON array of strings. No markdown formatting, no explanations. Just the JSON array."#,
        name = request.playlist_name,
        count = request.track_count,
        tempo = v.avg_tempo,
        energy = v.avg_energy,
        valence = v.avg_valence,
        dance = v.avg_danceability,
        acoustic = v.avg_acousticness,
        instrumental = v.avg_instrumentalness,
        speech = v.avg_speechiness,
        loudness = v.avg_loudness,
        label = request.vibe_label,
        n = NAME_COUNT,
    )
}

/// Remove a surrounding markdown code fence, with or without a language tag
fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Language tag, on its own line or not
    let body = rest
        .trim_start_matches(|c: char| c.is_ascii_alphanumeric())
        .trim();
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Parse and validate the generator's reply
pub fn parse_candidates(text: &str, original_name: &str) -> Result<Vec<String>, AnalysisError> {
    let names: Vec<String> = serde_json::from_str(strip_code_fence(text)).map_err(|e| {
        AnalysisError::Generation(format!("response is not a JSON array of strings: {e}"))
    })?;

    let names: Vec<String> = names.into_iter().map(|n| n.trim().to_string()).collect();

    if names.len() != NAME_COUNT {
        return Err(AnalysisError::Generation(format!(
            "expected {NAME_COUNT} names, got {}",
            names.len()
        )));
    }

    let original = original_name.trim();
    for name in &names {
        if name.split_whitespace().count() < 2 {
            return Err(AnalysisError::Generation(format!(
                "'{name}' is not a multi-word name"
            )));
        }
        if name.eq_ignore_ascii_case(original) {
            return Err(AnalysisError::Generation(format!(
                "'{name}' repeats the current playlist name"
            )));
        }
    }

    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIVE: &str = r#"["main character montage szn", "gym floor villain era", "sprinting thru the credits", "NO SKIPS ALLOWED TONIGHT", "sweat equity and serotonin"]"#;

    fn request() -> NamingRequest {
        NamingRequest {
            playlist_name: "gym".to_string(),
            track_count: 42,
            vector: AggregateVector {
                avg_tempo: 127.6,
                avg_energy: 0.8765,
                avg_valence: 0.6789,
                avg_danceability: 0.7123,
                avg_acousticness: 0.0456,
                avg_instrumentalness: 0.012,
                avg_speechiness: 0.081,
                avg_loudness: -5.43,
                track_count: 40,
            },
            vibe_label: VibeLabel::RageGym,
        }
    }

    #[test]
    fn test_prompt_reports_rounded_profile() {
        let prompt = build_prompt(&request());
        assert!(prompt.contains(r#"currently named "gym" with 42 tracks"#));
        assert!(prompt.contains("Average Tempo: 128 BPM"));
        assert!(prompt.contains("Average Energy: 0.88"));
        assert!(prompt.contains("Average Valence (Happiness): 0.68"));
        assert!(prompt.contains("Average Loudness: -5.4 dB"));
        assert!(prompt.contains(r#"Vibe Cluster: "Rage Gym / Main Character Energy""#));
        assert!(prompt.contains("generate exactly 5"));
    }

    #[test]
    fn test_parse_plain_array() {
        let names = parse_candidates(FIVE, "gym").unwrap();
        assert_eq!(names.len(), 5);
        assert_eq!(names[3], "NO SKIPS ALLOWED TONIGHT");
    }

    #[test]
    fn test_parse_fenced_array() {
        let fenced = format!("```json\n{FIVE}\n```");
        assert_eq!(parse_candidates(&fenced, "gym").unwrap().len(), 5);

        let bare_fence = format!("```\n{FIVE}\n```\n");
        assert_eq!(parse_candidates(&bare_fence, "gym").unwrap().len(), 5);

        let one_line = format!("```json {FIVE} ```");
        assert_eq!(parse_candidates(&one_line, "gym").unwrap().len(), 5);

        let one_line_no_tag = format!("```{FIVE}```");
        assert_eq!(parse_candidates(&one_line_no_tag, "gym").unwrap().len(), 5);
    }

    #[test]
    fn test_rejects_wrong_count() {
        let err = parse_candidates(r#"["one two", "three four"]"#, "gym").unwrap_err();
        assert!(matches!(err, AnalysisError::Generation(msg) if msg.contains("expected 5")));
    }

    #[test]
    fn test_rejects_single_word_names() {
        let text = r#"["vibes", "late night drive", "soft focus sundays", "villain era loading", "bpm and chill"]"#;
        assert!(matches!(
            parse_candidates(text, "gym"),
            Err(AnalysisError::Generation(_))
        ));
    }

    #[test]
    fn test_rejects_repeating_original_name() {
        let text = r#"["Leg Day Mix", "late night drive", "soft focus sundays", "villain era loading", "bpm and chill"]"#;
        let err = parse_candidates(text, "leg day mix").unwrap_err();
        assert!(err.to_string().contains("repeats the current playlist name"));
    }

    #[test]
    fn test_rejects_non_json() {
        let err = parse_candidates("Here are some names: ...", "gym").unwrap_err();
        assert!(matches!(err, AnalysisError::Generation(_)));
        let err = parse_candidates(r#"{"names": []}"#, "gym").unwrap_err();
        assert!(matches!(err, AnalysisError::Generation(_)));
    }

    #[test]
    fn test_missing_api_key_is_a_generation_error() {
        let namer = GeminiNamer::new(Agent::new(), "http://127.0.0.1:9", "gemini-2.5-flash", None);
        let err = namer.propose_names(&request()).unwrap_err();
        assert!(matches!(err, AnalysisError::Generation(msg) if msg.contains("API key")));
    }

    #[test]
    fn test_response_text_extraction() {
        let json = r#"{"candidates": [{"content": {"parts": [{"text": "[\"a b\","}, {"text": " \"c d\"]"}]}}]}"#;
        let response: GenerateContentResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.into_text().as_deref(), Some(r#"["a b", "c d"]"#));

        let empty: GenerateContentResponse = serde_json::from_str(r#"{"candidates": []}"#).unwrap();
        assert!(empty.into_text().is_none());
    }

    #[test]
    fn test_endpoint_uses_model() {
        let namer = GeminiNamer::new(Agent::new(), "https://gen.example/", "gemini-test", None);
        assert_eq!(
            namer.endpoint(),
            "https://gen.example/v1beta/models/gemini-test:generateContent"
        );
    }
}
