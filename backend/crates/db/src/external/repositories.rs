use async_trait::async_trait;
use uuid::Uuid;

use crate::crm::models::{Customer, CustomerFields};
use crate::external::models::{
    ClientSnapshot, ExternalClient, ExternalOrganization, ExternalOrganizationStatus,
    UpsertOutcome,
};
use tempora_common::error::TemporaResult;

/// External organizations and the shadow client rows they own.
#[async_trait]
pub trait ExternalRepository: Send + Sync {
    /// Return the organization with `code`, creating it as `pending` if absent.
    /// The boolean is `true` when a row was inserted.
    async fn find_or_create_organization(
        &self,
        code: &str,
        name: &str,
    ) -> TemporaResult<(ExternalOrganization, bool)>;

    async fn get_organization_by_code(&self, code: &str)
        -> TemporaResult<Option<ExternalOrganization>>;

    /// All organizations ordered by code, with their linked local organization.
    async fn list_organizations(&self) -> TemporaResult<Vec<ExternalOrganizationStatus>>;

    /// Atomically move an active organization to `syncing` and clear its error,
    /// only if it is not already syncing. Returns `None` when the transition
    /// was refused (already syncing, inactive, or gone).
    async fn begin_sync(&self, id: Uuid) -> TemporaResult<Option<ExternalOrganization>>;

    /// `syncing → completed`, stamping `last_sync_at`, the count and the local link.
    async fn mark_completed(
        &self,
        id: Uuid,
        clients_count: i32,
        local_organization_id: Uuid,
    ) -> TemporaResult<ExternalOrganization>;

    /// Record the local organization derived for this external organization.
    async fn set_local_organization(
        &self,
        id: Uuid,
        local_organization_id: Uuid,
    ) -> TemporaResult<()>;

    /// `syncing → failed` with the run-level error message.
    async fn mark_failed(&self, id: Uuid, error_message: &str)
        -> TemporaResult<ExternalOrganization>;

    /// Delete every client row of the organization and return it to `pending`
    /// with counters, error, timestamp and local link cleared.
    /// Returns the number of deleted client rows.
    async fn reset_organization(&self, id: Uuid) -> TemporaResult<u64>;

    /// Insert or update a client keyed by (external_organization_id, external_id).
    /// On update the payload and projection are overwritten and
    /// `local_customer_id` is left untouched.
    async fn upsert_client(
        &self,
        external_organization_id: Uuid,
        snapshot: &ClientSnapshot,
    ) -> TemporaResult<(ExternalClient, UpsertOutcome)>;

    /// Create the customer derived from a client and link the client to it,
    /// marking it transformed. Both writes commit together or not at all.
    async fn create_linked_customer(
        &self,
        client_id: Uuid,
        fields: &CustomerFields,
    ) -> TemporaResult<Customer>;
}
