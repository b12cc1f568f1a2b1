//! OAuth 2.0 client-credentials token acquisition and caching.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tempora_common::error::{TemporaError, TemporaResult};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use super::error::{PartnerError, PartnerResult};
use crate::clock::Clock;

/// Tokens are treated as expired this long before the provider says so.
const EXPIRY_SAFETY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    token_type: Option<String>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

/// Client id, secret and token endpoint for the client-credentials grant.
#[derive(Debug)]
pub struct TokenCredentials {
    pub client_id: String,
    pub client_secret: SecretString,
    pub token_url: String,
}

/// Acquires partner access tokens and caches them until shortly before expiry.
///
/// The cache lock is held while a token is being fetched, so concurrent
/// callers wait for the in-flight request instead of issuing their own.
pub struct TokenProvider {
    http_client: Client,
    credentials: TokenCredentials,
    clock: Arc<dyn Clock>,
    cached_token: Mutex<Option<CachedToken>>,
}

impl std::fmt::Debug for TokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenProvider")
            .field("client_id", &self.credentials.client_id)
            .field("token_url", &self.credentials.token_url)
            .finish_non_exhaustive()
    }
}

impl TokenProvider {
    pub fn new(
        credentials: TokenCredentials,
        timeout: Duration,
        clock: Arc<dyn Clock>,
    ) -> TemporaResult<Self> {
        let mut missing = Vec::new();
        if credentials.client_id.trim().is_empty() {
            missing.push("client id");
        }
        if credentials.client_secret.expose_secret().trim().is_empty() {
            missing.push("client secret");
        }
        if credentials.token_url.trim().is_empty() {
            missing.push("token URL");
        }
        if !missing.is_empty() {
            return Err(TemporaError::Config(format!(
                "missing partner credentials: {}",
                missing.join(", ")
            )));
        }

        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TemporaError::Config(format!("failed to build token client: {e}")))?;

        Ok(Self {
            http_client,
            credentials,
            clock,
            cached_token: Mutex::new(None),
        })
    }

    /// Return a valid access token, requesting a new one if the cache is
    /// empty or expired.
    #[instrument(skip(self))]
    pub async fn access_token(&self) -> PartnerResult<String> {
        let mut cache = self.cached_token.lock().await;

        if let Some(cached) = cache.as_ref() {
            if self.clock.now() < cached.expires_at {
                debug!("using cached partner token");
                return Ok(cached.access_token.clone());
            }
        }

        info!("requesting new OAuth 2.0 access token");
        match self.request_token().await {
            Ok(fresh) => {
                let token = fresh.access_token.clone();
                *cache = Some(fresh);
                Ok(token)
            }
            Err(e) => {
                *cache = None;
                tracing::error!(error = %e, "failed to obtain OAuth 2.0 access token");
                Err(e)
            }
        }
    }

    /// Drop the cached token so the next call fetches a fresh one.
    pub async fn clear_token_cache(&self) {
        *self.cached_token.lock().await = None;
        info!("OAuth 2.0 token cache cleared");
    }

    async fn request_token(&self) -> PartnerResult<CachedToken> {
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.credentials.client_id.as_str()),
            (
                "client_secret",
                self.credentials.client_secret.expose_secret(),
            ),
        ];

        let response = self
            .http_client
            .post(&self.credentials.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| PartnerError::Auth {
                status: None,
                message: format!("token request failed: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PartnerError::Auth {
                status: Some(status),
                message: format!("token endpoint returned {status}: {body}"),
            });
        }

        let token_response: TokenResponse =
            response.json().await.map_err(|e| PartnerError::Auth {
                status: Some(status),
                message: format!("failed to parse token response: {e}"),
            })?;

        let access_token = token_response
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| PartnerError::Auth {
                status: Some(status),
                message: "no access token received from OAuth provider".to_string(),
            })?;

        let expires_in = token_response.expires_in.unwrap_or(0);
        let lifetime = (expires_in - EXPIRY_SAFETY_MARGIN_SECS).max(0);
        let expires_at = self.clock.now() + chrono::Duration::seconds(lifetime);

        info!(
            token_type = token_response.token_type.as_deref().unwrap_or("unknown"),
            expires_in,
            "OAuth 2.0 access token obtained"
        );

        Ok(CachedToken {
            access_token,
            expires_at,
        })
    }
}
