use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde_json::Value;
use tempora_common::error::{TemporaError, TemporaResult};
use tempora_config::PartnerConfig;
use tracing::{info, instrument, warn};

use super::auth::{TokenCredentials, TokenProvider};
use super::error::{PartnerError, PartnerResult};
use super::models::{ClientPage, OrganizationStats, PartnerEnvelope};
use super::query::{compute_stats, decode_all, matches_search, paginate};
use crate::catalog::ExternalCatalog;
use crate::clock::Clock;

/// Authenticated access to the partner client registry.
#[derive(Clone)]
pub struct PartnerClient {
    http_client: Client,
    api_base_url: String,
    tokens: Arc<TokenProvider>,
    catalog: Arc<ExternalCatalog>,
}

impl PartnerClient {
    /// Build the client, its token provider and catalog from `config`.
    pub fn from_config(config: PartnerConfig, clock: Arc<dyn Clock>) -> TemporaResult<Self> {
        if config.api_base_url.trim().is_empty() {
            return Err(TemporaError::Config(
                "missing partner credentials: API base URL".to_string(),
            ));
        }

        let tokens = TokenProvider::new(
            TokenCredentials {
                client_id: config.client_id,
                client_secret: config.client_secret,
                token_url: config.token_url,
            },
            Duration::from_secs(config.token_timeout_secs),
            clock,
        )?;

        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TemporaError::Config(format!("failed to build partner client: {e}")))?;

        Ok(Self {
            http_client,
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            tokens: Arc::new(tokens),
            catalog: Arc::new(ExternalCatalog::new(config.organizations)),
        })
    }

    pub fn catalog(&self) -> &ExternalCatalog {
        &self.catalog
    }

    pub fn tokens(&self) -> &TokenProvider {
        &self.tokens
    }

    /// Fetch the complete, unfiltered client list of `code`.
    #[instrument(skip(self))]
    pub async fn fetch_all(&self, code: &str) -> PartnerResult<Vec<Value>> {
        self.catalog.validate(code)?;

        let url = format!(
            "{}/clientifornitori/getallclienti/{code}/cli/0",
            self.api_base_url
        );

        let mut response = self.get_with_token(&url).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            warn!(organization_code = %code, "partner API rejected token, refreshing once");
            self.tokens.clear_token_cache().await;
            response = self.get_with_token(&url).await?;
        }

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PartnerError::Http { status, body });
        }

        let body = response.text().await?;
        let records = decode_envelope(&body)?;
        info!(organization_code = %code, count = records.len(), "fetched partner clients");
        Ok(records)
    }

    /// One page of clients, optionally filtered by company name or id.
    pub async fn fetch_clients(
        &self,
        code: &str,
        page: usize,
        page_size: usize,
        search: Option<&str>,
    ) -> PartnerResult<ClientPage> {
        if page_size == 0 {
            return Err(PartnerError::InvalidRequest(
                "page size must be at least 1".to_string(),
            ));
        }
        let organization = self.catalog.validate(code)?.clone();
        let records = self.fetch_all(code).await?;

        let term = search.map(str::trim).filter(|t| !t.is_empty());
        let filtered: Vec<Value> = decode_all(records)
            .into_iter()
            .filter(|r| matches_search(r.payload.as_ref(), term.unwrap_or_default()))
            .map(|r| r.raw)
            .collect();

        let (clients, pagination) = paginate(filtered, page, page_size);
        Ok(ClientPage {
            organization,
            clients,
            pagination,
            search: term.map(str::to_string),
        })
    }

    /// Presence and role tallies over the full client list of `code`.
    pub async fn fetch_stats(&self, code: &str) -> PartnerResult<OrganizationStats> {
        let organization = self.catalog.validate(code)?.clone();
        let records = decode_all(self.fetch_all(code).await?);
        Ok(OrganizationStats {
            organization,
            statistics: compute_stats(&records),
        })
    }

    async fn get_with_token(&self, url: &str) -> PartnerResult<reqwest::Response> {
        let token = self.tokens.access_token().await?;
        Ok(self
            .http_client
            .get(url)
            .bearer_auth(token)
            .header("Content-Type", "application/json")
            .send()
            .await?)
    }
}

fn decode_envelope(body: &str) -> PartnerResult<Vec<Value>> {
    let envelope: PartnerEnvelope = serde_json::from_str(body)
        .map_err(|e| PartnerError::MalformedResponse(format!("unexpected response shape: {e}")))?;

    match envelope {
        PartnerEnvelope::Bare(records) => Ok(records),
        PartnerEnvelope::Wrapped {
            success: true,
            data: Some(records),
            ..
        } => Ok(records),
        PartnerEnvelope::Wrapped {
            success: true,
            data: None,
            ..
        } => Err(PartnerError::MalformedResponse(
            "response reported success without data".to_string(),
        )),
        PartnerEnvelope::Wrapped {
            success: false,
            message,
            ..
        } => Err(PartnerError::Rejected(
            message.unwrap_or_else(|| "no message".to_string()),
        )),
    }
}
