use serde_json::Value;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use tempora_common::error::{TemporaError, TemporaResult};
use tempora_db::crm::models::{CustomerFields, Organization, OrganizationRef};
use tempora_db::crm::repositories::CrmRepository;
use tempora_db::external::models::{ExternalClient, ExternalOrganization, UpsertOutcome};
use tempora_db::external::repositories::ExternalRepository;

use super::error::{ClientSyncError, SyncError};
use super::mapping;
use super::models::{
    CatalogInit, ResetSummary, SyncAllEntry, SyncAllReport, SyncStatusReport, SyncSummary,
};
use crate::partner::client::PartnerClient;
use crate::partner::models::ClientPayload;
use crate::response::ErrorBody;

/// Reconciles partner clients into external client rows and local customers.
pub struct ReconciliationEngine<E, C> {
    client: PartnerClient,
    external_repo: E,
    crm_repo: C,
}

impl<E, C> ReconciliationEngine<E, C>
where
    E: ExternalRepository,
    C: CrmRepository,
{
    pub fn new(client: PartnerClient, external_repo: E, crm_repo: C) -> Self {
        Self {
            client,
            external_repo,
            crm_repo,
        }
    }

    pub fn client(&self) -> &PartnerClient {
        &self.client
    }

    /// Register every catalog entry as an external organization.
    pub async fn initialize_catalog(&self) -> Result<CatalogInit, SyncError> {
        let mut created = 0;
        let mut organizations = Vec::with_capacity(self.client.catalog().len());

        for entry in self.client.catalog().organizations() {
            let (organization, inserted) = self
                .external_repo
                .find_or_create_organization(&entry.code, &entry.name)
                .await?;
            if inserted {
                info!(organization_code = %entry.code, "registered external organization");
                created += 1;
            }
            organizations.push(organization);
        }

        info!(
            total = organizations.len(),
            created, "external organization catalog initialized"
        );
        Ok(CatalogInit {
            total: organizations.len(),
            created,
            organizations,
        })
    }

    /// Fetch every client of `code` and upsert it together with its customer.
    ///
    /// Per-client failures are counted and skipped. Any other failure moves
    /// the organization to `failed` with the error message.
    #[instrument(skip(self))]
    pub async fn sync_organization(&self, code: &str) -> Result<SyncSummary, SyncError> {
        let organization = self
            .external_repo
            .get_organization_by_code(code)
            .await?
            .filter(|o| o.is_active)
            .ok_or_else(|| SyncError::NotFound(code.to_string()))?;

        if !organization.sync_status.can_start_sync() {
            warn!(organization_code = %code, "sync already running, refusing to start another");
            return Err(SyncError::InProgress(code.to_string()));
        }

        // The store re-checks the status atomically; a concurrent run can still win.
        let Some(organization) = self.external_repo.begin_sync(organization.id).await? else {
            warn!(organization_code = %code, "sync already running, refusing to start another");
            return Err(SyncError::InProgress(code.to_string()));
        };

        info!(organization_code = %code, "starting organization sync");

        match self.run(&organization).await {
            Ok(summary) => {
                info!(
                    organization_code = %code,
                    synced = summary.synced,
                    updated = summary.updated,
                    errors = summary.errors,
                    total = summary.total,
                    "organization sync completed"
                );
                Ok(summary)
            }
            Err(e) => {
                let message = e.to_string();
                error!(organization_code = %code, error = %message, "organization sync failed");
                if let Err(mark_err) = self
                    .external_repo
                    .mark_failed(organization.id, &message)
                    .await
                {
                    error!(
                        organization_code = %code,
                        error = %mark_err,
                        "failed to record sync failure"
                    );
                }
                Err(e)
            }
        }
    }

    /// Initialize the catalog, then sync each code in turn.
    pub async fn sync_all(&self) -> Result<SyncAllReport, SyncError> {
        self.initialize_catalog().await?;

        let mut results = Vec::with_capacity(self.client.catalog().len());
        for code in self.client.catalog().codes() {
            let entry = match self.sync_organization(code).await {
                Ok(summary) => SyncAllEntry::success(code, summary),
                Err(e) => SyncAllEntry::failure(code, ErrorBody::from(e)),
            };
            results.push(entry);
        }

        let report = SyncAllReport::new(results);
        info!(
            successful = report.summary.successful,
            failed = report.summary.failed,
            "bulk sync finished"
        );
        Ok(report)
    }

    /// Delete the organization's client rows and return it to `pending`.
    /// Derived customers are kept.
    pub async fn reset_organization(&self, code: &str) -> Result<ResetSummary, SyncError> {
        let organization = self
            .external_repo
            .get_organization_by_code(code)
            .await?
            .ok_or_else(|| SyncError::NotFound(code.to_string()))?;

        let deleted_clients = self.external_repo.reset_organization(organization.id).await?;
        info!(organization_code = %code, deleted_clients, "organization sync reset");

        Ok(ResetSummary {
            organization_code: code.to_string(),
            deleted_clients,
        })
    }

    pub async fn sync_status(&self) -> Result<SyncStatusReport, SyncError> {
        let organizations = self.external_repo.list_organizations().await?;
        Ok(SyncStatusReport::new(organizations))
    }

    async fn run(&self, organization: &ExternalOrganization) -> Result<SyncSummary, SyncError> {
        let local = self.resolve_local_organization(organization).await?;
        let records = self.client.fetch_all(&organization.external_code).await?;
        let total = records.len();

        let (mut synced, mut updated, mut errors) = (0, 0, 0);
        for raw in records {
            match self.sync_client(organization.id, local.id, raw).await {
                Ok(UpsertOutcome::Created) => synced += 1,
                Ok(UpsertOutcome::Updated) => updated += 1,
                Err(e) => {
                    warn!(
                        organization_code = %organization.external_code,
                        error = %e,
                        "failed to sync partner client"
                    );
                    errors += 1;
                }
            }
        }

        let clients_count = i32::try_from(synced + updated).unwrap_or(i32::MAX);
        self.external_repo
            .mark_completed(organization.id, clients_count, local.id)
            .await?;

        Ok(SyncSummary {
            organization: organization.external_name.clone(),
            organization_code: organization.external_code.clone(),
            local_organization: OrganizationRef {
                id: local.id,
                name: local.name,
            },
            synced,
            updated,
            errors,
            total,
        })
    }

    /// Reuse the linked local organization while it exists, otherwise create
    /// and link a new one.
    async fn resolve_local_organization(
        &self,
        organization: &ExternalOrganization,
    ) -> TemporaResult<Organization> {
        if let Some(id) = organization.local_organization_id {
            if let Some(existing) = self.crm_repo.get_organization(id).await? {
                return Ok(existing);
            }
            warn!(
                organization_code = %organization.external_code,
                local_organization_id = %id,
                "linked local organization is gone, creating a new one"
            );
        }

        let created = self
            .crm_repo
            .create_organization(mapping::local_organization(organization))
            .await?;
        self.external_repo
            .set_local_organization(organization.id, created.id)
            .await?;
        info!(
            organization_code = %organization.external_code,
            local_organization_id = %created.id,
            "created local organization"
        );
        Ok(created)
    }

    async fn sync_client(
        &self,
        external_organization_id: Uuid,
        local_organization_id: Uuid,
        raw: Value,
    ) -> Result<UpsertOutcome, ClientSyncError> {
        let payload = ClientPayload::from_raw(&raw)?;
        let external_id = payload.id;
        let store_err = |source: TemporaError| ClientSyncError::Store {
            external_id,
            source,
        };

        let snapshot = mapping::client_snapshot(&payload, raw);
        let (client, outcome) = self
            .external_repo
            .upsert_client(external_organization_id, &snapshot)
            .await
            .map_err(store_err)?;

        let fields = mapping::customer_fields(&payload, local_organization_id);
        self.apply_customer(&client, &fields)
            .await
            .map_err(store_err)?;

        Ok(outcome)
    }

    /// Refresh the linked customer in place, or create and link one when the
    /// client has none or its customer was deleted.
    async fn apply_customer(
        &self,
        client: &ExternalClient,
        fields: &CustomerFields,
    ) -> TemporaResult<()> {
        if let Some(customer_id) = client.local_customer_id {
            if self.crm_repo.get_customer(customer_id).await?.is_some() {
                self.crm_repo.update_customer(customer_id, fields).await?;
                return Ok(());
            }
            warn!(
                external_id = client.external_id,
                customer_id = %customer_id,
                "linked customer is gone, re-creating"
            );
        }

        self.external_repo
            .create_linked_customer(client.id, fields)
            .await?;
        Ok(())
    }
}
