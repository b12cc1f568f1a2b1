use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use tempora_common::error::TemporaResult;
use tempora_config::{OrganizationEntry, PartnerConfig};
use tempora_db::crm::repositories::CrmRepository;
use tempora_db::external::repositories::ExternalRepository;

use crate::clock::SystemClock;
use crate::partner::client::PartnerClient;
use crate::partner::models::{ClientPage, OrganizationStats};
use crate::response::{ErrorBody, ServiceResponse};
use crate::sync::models::{CatalogInit, ResetSummary, SyncAllReport, SyncStatusReport, SyncSummary};
use crate::sync::ReconciliationEngine;

#[derive(Debug, Clone, Serialize)]
pub struct TokenRefresh {
    pub token_obtained: bool,
    pub timestamp: DateTime<Utc>,
}

/// Caller-facing facade. Every operation reports through [`ServiceResponse`]
/// and never returns a bare error.
pub struct SyncService<E, C> {
    engine: ReconciliationEngine<E, C>,
}

impl<E, C> SyncService<E, C>
where
    E: ExternalRepository,
    C: CrmRepository,
{
    pub fn new(client: PartnerClient, external_repo: E, crm_repo: C) -> Self {
        Self {
            engine: ReconciliationEngine::new(client, external_repo, crm_repo),
        }
    }

    pub fn from_config(config: PartnerConfig, external_repo: E, crm_repo: C) -> TemporaResult<Self> {
        let client = PartnerClient::from_config(config, Arc::new(SystemClock))?;
        Ok(Self::new(client, external_repo, crm_repo))
    }

    fn client(&self) -> &PartnerClient {
        self.engine.client()
    }

    pub fn get_organizations(&self) -> ServiceResponse<Vec<OrganizationEntry>> {
        ServiceResponse::ok(self.client().catalog().organizations().to_vec())
    }

    pub fn get_organization_by_code(&self, code: &str) -> ServiceResponse<OrganizationEntry> {
        ServiceResponse::from_result(self.client().catalog().validate(code).cloned())
    }

    pub async fn fetch_clients(
        &self,
        code: &str,
        page: usize,
        limit: usize,
        search: Option<&str>,
    ) -> ServiceResponse<ClientPage> {
        ServiceResponse::from_result(self.client().fetch_clients(code, page, limit, search).await)
    }

    pub async fn fetch_stats(&self, code: &str) -> ServiceResponse<OrganizationStats> {
        ServiceResponse::from_result(self.client().fetch_stats(code).await)
    }

    pub async fn initialize_catalog(&self) -> ServiceResponse<CatalogInit> {
        ServiceResponse::from_result(self.engine.initialize_catalog().await)
    }

    pub async fn sync_organization(&self, code: &str) -> ServiceResponse<SyncSummary> {
        ServiceResponse::from_result(self.engine.sync_organization(code).await)
    }

    /// Succeeds only when every code synced; otherwise the full report is
    /// returned alongside a `PARTIAL_FAILURE` error.
    pub async fn sync_all(&self) -> ServiceResponse<SyncAllReport> {
        match self.engine.sync_all().await {
            Ok(report) if report.is_success() => ServiceResponse::ok(report),
            Ok(report) => {
                let message = format!(
                    "sync completed: {} successful, {} failed",
                    report.summary.successful, report.summary.failed
                );
                ServiceResponse::partial(report, ErrorBody::new("PARTIAL_FAILURE", message))
            }
            Err(e) => ServiceResponse::err(e),
        }
    }

    pub async fn get_sync_status(&self) -> ServiceResponse<SyncStatusReport> {
        ServiceResponse::from_result(self.engine.sync_status().await)
    }

    pub async fn reset_organization(&self, code: &str) -> ServiceResponse<ResetSummary> {
        ServiceResponse::from_result(self.engine.reset_organization(code).await)
    }

    /// Discard the cached token and acquire a fresh one.
    pub async fn refresh_token(&self) -> ServiceResponse<TokenRefresh> {
        let tokens = self.client().tokens();
        tokens.clear_token_cache().await;
        match tokens.access_token().await {
            Ok(_) => {
                info!("partner token refreshed on request");
                ServiceResponse::ok(TokenRefresh {
                    token_obtained: true,
                    timestamp: Utc::now(),
                })
            }
            Err(e) => ServiceResponse::err(e),
        }
    }
}
