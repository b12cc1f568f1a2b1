use async_trait::async_trait;
use uuid::Uuid;

use crate::crm::models::{Customer, CustomerFields, NewOrganization, Organization};
use tempora_common::error::TemporaResult;

/// Local organizations and customers written by the sync engine.
#[async_trait]
pub trait CrmRepository: Send + Sync {
    async fn get_organization(&self, id: Uuid) -> TemporaResult<Option<Organization>>;
    async fn create_organization(&self, org: NewOrganization) -> TemporaResult<Organization>;

    async fn get_customer(&self, id: Uuid) -> TemporaResult<Option<Customer>>;

    /// Overwrite every writable field of an existing customer in place.
    /// Fails with `NotFound` if the row is gone.
    async fn update_customer(&self, id: Uuid, fields: &CustomerFields) -> TemporaResult<Customer>;
}
