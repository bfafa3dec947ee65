use thiserror::Error;

/// Every way a single analysis attempt can fail. All variants are terminal
/// for the attempt; callers may retry the whole request.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("catalog service request failed{}: {message}", status_suffix(.status))]
    Upstream { status: Option<u16>, message: String },
    #[error("Playlist has no tracks")]
    EmptyPlaylist,
    #[error("Could not fetch audio features for any tracks")]
    NoFeatures,
    #[error("name generation failed: {0}")]
    Generation(String),
    #[error("failed to store analysis: {0}")]
    Persistence(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

impl AnalysisError {
    pub fn upstream(message: impl Into<String>) -> Self {
        AnalysisError::Upstream {
            status: None,
            message: message.into(),
        }
    }

    /// Short message suitable for showing to the user. Cause detail stays in the log.
    pub fn user_message(&self) -> &'static str {
        match self {
            AnalysisError::Upstream { status: Some(401), .. } => {
                "Spotify rejected the credentials. Please log in again."
            }
            AnalysisError::Upstream { status: Some(404), .. } => "Not found on Spotify.",
            AnalysisError::Upstream { .. } => "Spotify request failed. Try again in a moment.",
            AnalysisError::EmptyPlaylist => "Playlist has no tracks.",
            AnalysisError::NoFeatures => "Could not fetch audio features for any tracks.",
            AnalysisError::Generation(_) => "Failed to generate playlist names.",
            AnalysisError::Persistence(_) => "Analysis finished but could not be saved.",
            AnalysisError::InvalidRequest(_) => "The request is missing required input.",
        }
    }
}

impl From<rusqlite::Error> for AnalysisError {
    fn from(e: rusqlite::Error) -> Self {
        AnalysisError::Persistence(e.to_string())
    }
}

impl From<serde_json::Error> for AnalysisError {
    fn from(e: serde_json::Error) -> Self {
        AnalysisError::Persistence(e.to_string())
    }
}

/// Convert a ureq failure into an upstream error, keeping the HTTP status and body.
pub(crate) fn upstream_error(context: &str, err: ureq::Error) -> AnalysisError {
    match err {
        ureq::Error::Status(code, response) => {
            let body = response.into_string().unwrap_or_default();
            AnalysisError::Upstream {
                status: Some(code),
                message: format!("{context}: {body}"),
            }
        }
        ureq::Error::Transport(t) => AnalysisError::upstream(format!("{context}: {t}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages_for_empty_results() {
        assert_eq!(AnalysisError::EmptyPlaylist.to_string(), "Playlist has no tracks");
        assert_eq!(
            AnalysisError::NoFeatures.to_string(),
            "Could not fetch audio features for any tracks"
        );
    }

    #[test]
    fn test_upstream_display_includes_status() {
        let err = AnalysisError::Upstream {
            status: Some(404),
            message: "get playlist: not found".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "catalog service request failed (HTTP 404): get playlist: not found"
        );
        assert_eq!(err.user_message(), "Not found on Spotify.");

        let transport = AnalysisError::upstream("connection refused");
        assert_eq!(
            transport.to_string(),
            "catalog service request failed: connection refused"
        );
    }

    #[test]
    fn test_user_message_hides_cause() {
        let err = AnalysisError::Generation("Missing Gemini API key".to_string());
        assert!(!err.user_message().contains("Gemini"));
        let err = AnalysisError::Persistence("disk I/O error".to_string());
        assert!(!err.user_message().contains("disk"));
        let err = AnalysisError::InvalidRequest("newName is required".to_string());
        assert!(!err.user_message().contains("newName"));
    }
}
