//! OAuth2 access-token lifecycle.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::client::CreatorError;
use crate::config::CreatorConfig;

/// On-disk shape of the token cache file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedToken {
    pub access_token: String,
    /// Unix seconds at which the token was persisted.
    pub saved_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
}

/// Holds the single current bearer token shared by all outbound calls.
///
/// Acquisition is lazy (first call refreshes when nothing is cached) and
/// refresh is reactive (the client refreshes once on a 401/403). The token
/// cache file is read at construction and overwritten on every refresh;
/// persisting is best-effort and never fails a refresh that already
/// obtained a token.
#[derive(Debug)]
pub struct TokenManager {
    token_url: String,
    client_id: String,
    client_secret: String,
    refresh_token: String,
    token_file: PathBuf,
    current: Mutex<Option<String>>,
    http: reqwest::Client,
}

impl TokenManager {
    pub fn new(config: &CreatorConfig, http: reqwest::Client) -> Self {
        let cached = load_token_file(&config.token_file).map(|t| t.access_token);

        Self {
            token_url: config.token_url(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            refresh_token: config.refresh_token.clone(),
            token_file: config.token_file.clone(),
            current: Mutex::new(cached),
            http,
        }
    }

    /// The cached token, if any.
    pub async fn current(&self) -> Option<String> {
        self.current.lock().await.clone()
    }

    /// The cached token, refreshing if nothing is cached yet.
    pub async fn acquire(&self) -> Result<String, CreatorError> {
        if let Some(token) = self.current().await {
            return Ok(token);
        }
        self.refresh().await
    }

    /// Exchange the refresh credential for a fresh access token.
    ///
    /// On success the new token replaces the cached one and is persisted to
    /// the token cache file.
    pub async fn refresh(&self) -> Result<String, CreatorError> {
        let params = [
            ("refresh_token", self.refresh_token.as_str()),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("grant_type", "refresh_token"),
        ];

        let resp = self
            .http
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| CreatorError::Network(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(CreatorError::Auth(format!(
                "token endpoint returned {status}: {body}"
            )));
        }

        let body: Value = resp
            .json()
            .await
            .map_err(|e| CreatorError::Parse(e.to_string()))?;

        let token = body
            .get("access_token")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                CreatorError::Auth("token endpoint response carried no access_token".to_string())
            })?
            .to_string();

        let expires_in = body.get("expires_in").and_then(Value::as_u64);

        *self.current.lock().await = Some(token.clone());
        self.persist(&token, expires_in);

        tracing::info!("obtained a fresh access token");
        Ok(token)
    }

    fn persist(&self, access_token: &str, expires_in: Option<u64>) {
        let cached = CachedToken {
            access_token: access_token.to_string(),
            saved_at: Utc::now().timestamp(),
            expires_in,
        };

        match serde_json::to_string(&cached) {
            Ok(json) => {
                if let Err(err) = std::fs::write(&self.token_file, json) {
                    tracing::warn!("could not persist token cache file: {err}");
                }
            }
            Err(err) => tracing::warn!("could not serialize token cache: {err}"),
        }
    }
}

/// Read the token cache file, tolerating absence and corruption.
fn load_token_file(path: &Path) -> Option<CachedToken> {
    let contents = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&contents) {
        Ok(cached) => Some(cached),
        Err(err) => {
            tracing::warn!("ignoring unreadable token cache file {path:?}: {err}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn config_with_token_file(path: PathBuf) -> CreatorConfig {
        CreatorConfig {
            client_id: "cid".into(),
            client_secret: "secret".into(),
            refresh_token: "rt".into(),
            api_domain: "https://api.invalid".into(),
            accounts_domain: "https://accounts.invalid".into(),
            owner_name: "owner".into(),
            app_link_name: "app".into(),
            token_file: path,
            request_timeout: Duration::from_secs(20),
        }
    }

    fn temp_token_path() -> PathBuf {
        std::env::temp_dir().join(format!("depotrack-token-{}.json", uuid::Uuid::now_v7()))
    }

    #[tokio::test]
    async fn loads_cached_token_at_construction() {
        let path = temp_token_path();
        std::fs::write(
            &path,
            r#"{"access_token":"cached-tok","saved_at":1700000000,"expires_in":3600}"#,
        )
        .unwrap();

        let manager = TokenManager::new(&config_with_token_file(path.clone()), reqwest::Client::new());
        assert_eq!(manager.current().await.as_deref(), Some("cached-tok"));

        std::fs::remove_file(path).ok();
    }

    #[tokio::test]
    async fn missing_or_corrupt_cache_file_yields_no_token() {
        let missing = TokenManager::new(
            &config_with_token_file(temp_token_path()),
            reqwest::Client::new(),
        );
        assert!(missing.current().await.is_none());

        let path = temp_token_path();
        std::fs::write(&path, "not json").unwrap();
        let corrupt =
            TokenManager::new(&config_with_token_file(path.clone()), reqwest::Client::new());
        assert!(corrupt.current().await.is_none());

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn cache_file_shape_round_trips() {
        let cached = CachedToken {
            access_token: "tok".into(),
            saved_at: 1700000000,
            expires_in: None,
        };

        let json = serde_json::to_string(&cached).unwrap();
        // expires_in is omitted when absent, matching the historical file shape.
        assert!(!json.contains("expires_in"));

        let back: CachedToken = serde_json::from_str(&json).unwrap();
        assert_eq!(back.access_token, "tok");
        assert_eq!(back.saved_at, 1700000000);
    }
}
