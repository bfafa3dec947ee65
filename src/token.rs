use crate::error::{AnalysisError, upstream_error};
use crate::models::TokenResponse;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, TimeDelta, Utc};
use std::sync::Mutex;
use ureq::Agent;

/// Seconds shaved off a token's lifetime so it is never used right at expiry
pub const EXPIRY_MARGIN_SECS: i64 = 60;

/// Source of the current time, injectable for tests
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Anything that can hand the catalog client a bearer token
pub trait CredentialProvider: Send + Sync {
    fn access_token(&self) -> Result<String, AnalysisError>;
}

/// A token owned by the user's session. Its lifecycle is managed elsewhere.
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        StaticToken(token.into())
    }
}

impl CredentialProvider for StaticToken {
    fn access_token(&self) -> Result<String, AnalysisError> {
        Ok(self.0.clone())
    }
}

/// A freshly issued token and its lifetime in seconds
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub access_token: String,
    pub expires_in: u64,
}

pub trait TokenSource: Send + Sync {
    fn fetch_token(&self) -> Result<IssuedToken, AnalysisError>;
}

/// Client-credentials grant against the Spotify accounts service
pub struct ClientCredentials {
    agent: Agent,
    accounts_base: String,
    client_id: String,
    client_secret: String,
}

impl ClientCredentials {
    pub fn new(
        agent: Agent,
        accounts_base: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        ClientCredentials {
            agent,
            accounts_base: accounts_base.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    fn basic_auth_header(&self) -> String {
        let credentials = format!("{}:{}", self.client_id, self.client_secret);
        format!("Basic {}", STANDARD.encode(credentials))
    }
}

impl TokenSource for ClientCredentials {
    fn fetch_token(&self) -> Result<IssuedToken, AnalysisError> {
        let url = format!("{}/api/token", self.accounts_base.trim_end_matches('/'));

        let response: TokenResponse = self
            .agent
            .post(&url)
            .set("Authorization", &self.basic_auth_header())
            .send_form(&[("grant_type", "client_credentials")])
            .map_err(|e| upstream_error("token request", e))?
            .into_json()
            .map_err(|e| AnalysisError::upstream(format!("invalid token response: {e}")))?;

        Ok(IssuedToken {
            access_token: response.access_token,
            expires_in: response.expires_in,
        })
    }
}

struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

/// Process-scoped token cache. Refreshes through the source only once the
/// cached token has expired according to the injected clock.
pub struct TokenCache<S, K> {
    source: S,
    clock: K,
    cached: Mutex<Option<CachedToken>>,
}

impl<S: TokenSource, K: Clock> TokenCache<S, K> {
    pub fn new(source: S, clock: K) -> Self {
        TokenCache {
            source,
            clock,
            cached: Mutex::new(None),
        }
    }

    pub fn get_token(&self) -> Result<String, AnalysisError> {
        let mut cached = self.cached.lock().unwrap_or_else(|e| e.into_inner());
        let now = self.clock.now();

        if let Some(current) = cached.as_ref() {
            if now < current.expires_at {
                return Ok(current.token.clone());
            }
            log::debug!("Cached token expired at {}, refreshing", current.expires_at);
        }

        let issued = self.source.fetch_token()?;
        let lifetime = TimeDelta::seconds(issued.expires_in as i64 - EXPIRY_MARGIN_SECS);
        *cached = Some(CachedToken {
            token: issued.access_token.clone(),
            expires_at: now + lifetime,
        });
        log::info!("Obtained new access token valid for {}s", issued.expires_in);

        Ok(issued.access_token)
    }
}

impl<S: TokenSource, K: Clock> CredentialProvider for TokenCache<S, K> {
    fn access_token(&self) -> Result<String, AnalysisError> {
        self.get_token()
    }
}
