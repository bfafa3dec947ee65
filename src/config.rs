use anyhow::{Context, Result};
use std::time::Duration;

pub const DEFAULT_SPOTIFY_API_BASE: &str = "https://api.spotify.com/v1";
pub const DEFAULT_SPOTIFY_ACCOUNTS_BASE: &str = "https://accounts.spotify.com";
pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_DATABASE_PATH: &str = "mood-muse.db";

/// How the tool authenticates against Spotify
#[derive(Debug, Clone, PartialEq)]
pub enum SpotifyAuth {
    /// Bearer token handed over by the user's session
    AccessToken(String),
    /// App credentials, exchanged for a token on demand (public data only)
    ClientCredentials {
        client_id: String,
        client_secret: String,
    },
}

/// Configuration loaded from environment variables
#[derive(Debug)]
pub struct Config {
    pub spotify_auth: SpotifyAuth,
    pub spotify_api_base: String,
    pub spotify_accounts_base: String,
    pub gemini_api_key: Option<String>,
    pub gemini_api_base: String,
    pub gemini_model: String,
    pub database_path: String,
    pub http_timeout: Duration,
}

/// Load configuration from `.env` and environment
pub fn load_config() -> Result<Config> {
    // Load `.env` file if present
    dotenv::dotenv().ok();
    config_from(|key| std::env::var(key).ok())
}

/// Build the configuration from any key lookup
pub fn config_from<F>(lookup: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    let spotify_auth = match var("SPOTIFY_ACCESS_TOKEN") {
        Some(token) => SpotifyAuth::AccessToken(token),
        None => {
            let client_id = var("SPOTIFY_CLIENT_ID")
                .context("Set SPOTIFY_ACCESS_TOKEN or SPOTIFY_CLIENT_ID/SPOTIFY_CLIENT_SECRET")?;
            let client_secret = var("SPOTIFY_CLIENT_SECRET")
                .context("SPOTIFY_CLIENT_SECRET is required with SPOTIFY_CLIENT_ID")?;
            SpotifyAuth::ClientCredentials {
                client_id,
                client_secret,
            }
        }
    };

    let http_timeout = match var("HTTP_TIMEOUT_SECS") {
        Some(secs) => Duration::from_secs(
            secs.parse::<u64>()
                .with_context(|| format!("HTTP_TIMEOUT_SECS must be a whole number, got '{secs}'"))?,
        ),
        None => Duration::from_secs(30),
    };

    Ok(Config {
        spotify_auth,
        spotify_api_base: var("SPOTIFY_API_BASE")
            .unwrap_or_else(|| DEFAULT_SPOTIFY_API_BASE.to_string()),
        spotify_accounts_base: var("SPOTIFY_ACCOUNTS_BASE")
            .unwrap_or_else(|| DEFAULT_SPOTIFY_ACCOUNTS_BASE.to_string()),
        gemini_api_key: var("GEMINI_API_KEY").or_else(|| var("VITE_GEMINI_API_KEY")),
        gemini_api_base: var("GEMINI_API_BASE")
            .unwrap_or_else(|| DEFAULT_GEMINI_API_BASE.to_string()),
        gemini_model: var("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
        database_path: var("DATABASE_PATH").unwrap_or_else(|| DEFAULT_DATABASE_PATH.to_string()),
        http_timeout,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_access_token_wins_over_client_credentials() {
        let config = config_from(lookup(&[
            ("SPOTIFY_ACCESS_TOKEN", "user-token"),
            ("SPOTIFY_CLIENT_ID", "id"),
            ("SPOTIFY_CLIENT_SECRET", "secret"),
        ]))
        .unwrap();
        assert_eq!(
            config.spotify_auth,
            SpotifyAuth::AccessToken("user-token".to_string())
        );
        assert_eq!(config.spotify_api_base, DEFAULT_SPOTIFY_API_BASE);
        assert_eq!(config.database_path, DEFAULT_DATABASE_PATH);
        assert_eq!(config.http_timeout, Duration::from_secs(30));
        assert!(config.gemini_api_key.is_none());
    }

    #[test]
    fn test_client_credentials_need_both_halves() {
        assert!(config_from(lookup(&[("SPOTIFY_CLIENT_ID", "id")])).is_err());
        assert!(config_from(lookup(&[])).is_err());

        let config = config_from(lookup(&[
            ("SPOTIFY_CLIENT_ID", "id"),
            ("SPOTIFY_CLIENT_SECRET", "secret"),
            ("VITE_GEMINI_API_KEY", "legacy-key"),
            ("HTTP_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();
        assert_eq!(
            config.spotify_auth,
            SpotifyAuth::ClientCredentials {
                client_id: "id".to_string(),
                client_secret: "secret".to_string(),
            }
        );
        assert_eq!(config.gemini_api_key.as_deref(), Some("legacy-key"));
        assert_eq!(config.http_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_blank_values_are_ignored() {
        let config = config_from(lookup(&[
            ("SPOTIFY_ACCESS_TOKEN", "token"),
            ("GEMINI_API_KEY", "  "),
        ]))
        .unwrap();
        assert!(config.gemini_api_key.is_none());
    }

    #[test]
    fn test_bad_timeout_is_rejected() {
        let result = config_from(lookup(&[
            ("SPOTIFY_ACCESS_TOKEN", "token"),
            ("HTTP_TIMEOUT_SECS", "soon"),
        ]));
        assert!(result.is_err());
    }
}
