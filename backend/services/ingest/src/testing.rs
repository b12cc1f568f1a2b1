//! Shared fakes for unit tests: a manual clock, wiremock helpers for the
//! partner API, and an in-memory store implementing both repositories.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use secrecy::SecretString;
use serde_json::{json, Value};
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tempora_common::error::{TemporaError, TemporaResult};
use tempora_config::partner::{parse_organizations, DEFAULT_ORGANIZATIONS};
use tempora_config::PartnerConfig;
use tempora_db::crm::models::{
    Customer, CustomerFields, NewOrganization, Organization, OrganizationRef,
};
use tempora_db::crm::repositories::CrmRepository;
use tempora_db::external::models::{
    ClientSnapshot, ExternalClient, ExternalOrganization, ExternalOrganizationStatus, SyncStatus,
    UpsertOutcome, CLIENT_STATUS_SYNCED, CLIENT_STATUS_TRANSFORMED,
};
use tempora_db::external::repositories::ExternalRepository;

use crate::clock::Clock;
use crate::partner::client::PartnerClient;

// ── Clock ───────────────────────────────────────────────────────

pub(crate) struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self {
            now: Mutex::new(Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()),
        }
    }
}

impl ManualClock {
    pub(crate) fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

// ── Partner API ─────────────────────────────────────────────────

pub(crate) fn token_body(token: &str, expires_in: i64) -> Value {
    json!({ "access_token": token, "expires_in": expires_in, "token_type": "Bearer" })
}

pub(crate) async fn mount_token(server: &MockServer, token: &str) {
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body(token, 3600)))
        .mount(server)
        .await;
}

pub(crate) async fn mount_client_list(server: &MockServer, code: &str, records: Vec<Value>) {
    Mock::given(method("GET"))
        .and(path(format!("/clientifornitori/getallclienti/{code}/cli/0")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "success": true, "data": records })),
        )
        .mount(server)
        .await;
}

pub(crate) fn record(id: i64, name: &str) -> Value {
    json!({ "id": id, "ragsoc": name, "flG_CLIENTE": true })
}

pub(crate) fn partner_config(server: &MockServer) -> PartnerConfig {
    PartnerConfig {
        client_id: "client-id".to_string(),
        client_secret: SecretString::from("s3cret".to_string()),
        token_url: format!("{}/oauth2/token", server.uri()),
        api_base_url: server.uri(),
        token_timeout_secs: 5,
        timeout_secs: 5,
        organizations: parse_organizations(DEFAULT_ORGANIZATIONS).unwrap(),
    }
}

pub(crate) fn partner_client(server: &MockServer) -> PartnerClient {
    PartnerClient::from_config(partner_config(server), Arc::new(ManualClock::default())).unwrap()
}

// ── In-memory store ─────────────────────────────────────────────

#[derive(Default)]
struct StoreState {
    external_orgs: Vec<ExternalOrganization>,
    clients: Vec<ExternalClient>,
    organizations: Vec<Organization>,
    customers: Vec<Customer>,
    failing_customer_names: HashSet<String>,
    failing_links: usize,
}

/// Both repositories over one shared state; clones share it too.
#[derive(Clone, Default)]
pub(crate) struct InMemoryStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryStore {
    /// Make customer writes fail for clients with this company name.
    pub(crate) fn fail_customer_named(&self, name: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_customer_names
            .insert(name.to_string());
    }

    /// Make the next `count` create-and-link calls fail as a whole.
    pub(crate) fn fail_next_links(&self, count: usize) {
        self.state.lock().unwrap().failing_links = count;
    }

    pub(crate) fn external_org(&self, code: &str) -> Option<ExternalOrganization> {
        self.state
            .lock()
            .unwrap()
            .external_orgs
            .iter()
            .find(|o| o.external_code == code)
            .cloned()
    }

    pub(crate) fn clients_of(&self, external_organization_id: Uuid) -> Vec<ExternalClient> {
        self.state
            .lock()
            .unwrap()
            .clients
            .iter()
            .filter(|c| c.external_organization_id == external_organization_id)
            .cloned()
            .collect()
    }

    pub(crate) fn customers(&self) -> Vec<Customer> {
        self.state.lock().unwrap().customers.clone()
    }

    pub(crate) fn organizations(&self) -> Vec<Organization> {
        self.state.lock().unwrap().organizations.clone()
    }

    pub(crate) fn delete_customer(&self, id: Uuid) {
        self.state.lock().unwrap().customers.retain(|c| c.id != id);
    }

    pub(crate) fn force_status(&self, code: &str, status: SyncStatus) {
        let mut state = self.state.lock().unwrap();
        if let Some(org) = state
            .external_orgs
            .iter_mut()
            .find(|o| o.external_code == code)
        {
            org.sync_status = status;
        }
    }

    pub(crate) fn deactivate(&self, code: &str) {
        let mut state = self.state.lock().unwrap();
        if let Some(org) = state
            .external_orgs
            .iter_mut()
            .find(|o| o.external_code == code)
        {
            org.is_active = false;
        }
    }

    fn with_org<T>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut ExternalOrganization) -> T,
    ) -> TemporaResult<T> {
        let mut state = self.state.lock().unwrap();
        let result = state.external_orgs.iter_mut().find(|o| o.id == id).map(f);
        result.ok_or_else(|| TemporaError::NotFound(format!("external organization not found: {id}")))
    }
}

#[async_trait]
impl ExternalRepository for InMemoryStore {
    async fn find_or_create_organization(
        &self,
        code: &str,
        name: &str,
    ) -> TemporaResult<(ExternalOrganization, bool)> {
        let mut state = self.state.lock().unwrap();
        if let Some(existing) = state.external_orgs.iter().find(|o| o.external_code == code) {
            return Ok((existing.clone(), false));
        }
        let now = Utc::now();
        let org = ExternalOrganization {
            id: Uuid::new_v4(),
            external_code: code.to_string(),
            external_name: name.to_string(),
            local_organization_id: None,
            last_sync_at: None,
            sync_status: SyncStatus::Pending,
            sync_error: None,
            clients_count: 0,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        state.external_orgs.push(org.clone());
        Ok((org, true))
    }

    async fn get_organization_by_code(
        &self,
        code: &str,
    ) -> TemporaResult<Option<ExternalOrganization>> {
        Ok(self.external_org(code))
    }

    async fn list_organizations(&self) -> TemporaResult<Vec<ExternalOrganizationStatus>> {
        let state = self.state.lock().unwrap();
        let mut orgs: Vec<ExternalOrganizationStatus> = state
            .external_orgs
            .iter()
            .map(|o| ExternalOrganizationStatus {
                organization: o.clone(),
                local_organization: o.local_organization_id.and_then(|id| {
                    state
                        .organizations
                        .iter()
                        .find(|l| l.id == id)
                        .map(|l| OrganizationRef {
                            id: l.id,
                            name: l.name.clone(),
                        })
                }),
            })
            .collect();
        orgs.sort_by(|a, b| a.organization.external_code.cmp(&b.organization.external_code));
        Ok(orgs)
    }

    async fn begin_sync(&self, id: Uuid) -> TemporaResult<Option<ExternalOrganization>> {
        let mut state = self.state.lock().unwrap();
        let Some(org) = state.external_orgs.iter_mut().find(|o| o.id == id) else {
            return Ok(None);
        };
        if !org.is_active || !org.sync_status.can_start_sync() {
            return Ok(None);
        }
        org.sync_status = SyncStatus::Syncing;
        org.sync_error = None;
        org.updated_at = Utc::now();
        Ok(Some(org.clone()))
    }

    async fn mark_completed(
        &self,
        id: Uuid,
        clients_count: i32,
        local_organization_id: Uuid,
    ) -> TemporaResult<ExternalOrganization> {
        self.with_org(id, |org| {
            let now = Utc::now();
            org.sync_status = SyncStatus::Completed;
            org.last_sync_at = Some(now);
            org.clients_count = clients_count;
            org.local_organization_id = Some(local_organization_id);
            org.sync_error = None;
            org.updated_at = now;
            org.clone()
        })
    }

    async fn set_local_organization(
        &self,
        id: Uuid,
        local_organization_id: Uuid,
    ) -> TemporaResult<()> {
        self.with_org(id, |org| {
            org.local_organization_id = Some(local_organization_id);
        })
    }

    async fn mark_failed(
        &self,
        id: Uuid,
        error_message: &str,
    ) -> TemporaResult<ExternalOrganization> {
        self.with_org(id, |org| {
            org.sync_status = SyncStatus::Failed;
            org.sync_error = Some(error_message.to_string());
            org.updated_at = Utc::now();
            org.clone()
        })
    }

    async fn reset_organization(&self, id: Uuid) -> TemporaResult<u64> {
        self.with_org(id, |org| {
            org.sync_status = SyncStatus::Pending;
            org.last_sync_at = None;
            org.clients_count = 0;
            org.sync_error = None;
            org.local_organization_id = None;
        })?;
        let mut state = self.state.lock().unwrap();
        let before = state.clients.len();
        state.clients.retain(|c| c.external_organization_id != id);
        Ok((before - state.clients.len()) as u64)
    }

    async fn upsert_client(
        &self,
        external_organization_id: Uuid,
        snapshot: &ClientSnapshot,
    ) -> TemporaResult<(ExternalClient, UpsertOutcome)> {
        let mut state = self.state.lock().unwrap();
        let now = Utc::now();
        if let Some(existing) = state.clients.iter_mut().find(|c| {
            c.external_organization_id == external_organization_id
                && c.external_id == snapshot.external_id
        }) {
            existing.external_data = snapshot.external_data.clone();
            existing.fields = snapshot.fields.clone();
            existing.last_sync_at = now;
            existing.updated_at = now;
            existing.sync_status = if existing.local_customer_id.is_some() {
                CLIENT_STATUS_TRANSFORMED
            } else {
                CLIENT_STATUS_SYNCED
            }
            .to_string();
            return Ok((existing.clone(), UpsertOutcome::Updated));
        }

        let client = ExternalClient {
            id: Uuid::new_v4(),
            external_organization_id,
            external_id: snapshot.external_id,
            local_customer_id: None,
            external_data: snapshot.external_data.clone(),
            fields: snapshot.fields.clone(),
            last_sync_at: now,
            sync_status: CLIENT_STATUS_SYNCED.to_string(),
            created_at: now,
            updated_at: now,
        };
        state.clients.push(client.clone());
        Ok((client, UpsertOutcome::Created))
    }

    async fn create_linked_customer(
        &self,
        client_id: Uuid,
        fields: &CustomerFields,
    ) -> TemporaResult<Customer> {
        let mut state = self.state.lock().unwrap();
        if state.failing_customer_names.contains(&fields.name) {
            return Err(TemporaError::Database(format!(
                "injected failure for {}",
                fields.name
            )));
        }
        if !state.clients.iter().any(|c| c.id == client_id) {
            return Err(TemporaError::NotFound(format!(
                "external client not found: {client_id}"
            )));
        }
        // A failed link rolls back the customer insert too.
        if state.failing_links > 0 {
            state.failing_links -= 1;
            return Err(TemporaError::Database("injected link failure".to_string()));
        }

        let now = Utc::now();
        let customer = Customer {
            id: Uuid::new_v4(),
            organization_id: fields.organization_id,
            name: fields.name.clone(),
            description: fields.description.clone(),
            contact_email: fields.contact_email.clone(),
            contact_phone: fields.contact_phone.clone(),
            address: fields.address.clone(),
            work_location: fields.work_location.clone(),
            is_active: fields.is_active,
            created_at: now,
            updated_at: now,
        };
        state.customers.push(customer.clone());
        if let Some(client) = state.clients.iter_mut().find(|c| c.id == client_id) {
            client.local_customer_id = Some(customer.id);
            client.sync_status = CLIENT_STATUS_TRANSFORMED.to_string();
        }
        Ok(customer)
    }
}

#[async_trait]
impl CrmRepository for InMemoryStore {
    async fn get_organization(&self, id: Uuid) -> TemporaResult<Option<Organization>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .organizations
            .iter()
            .find(|o| o.id == id)
            .cloned())
    }

    async fn create_organization(&self, org: NewOrganization) -> TemporaResult<Organization> {
        let now = Utc::now();
        let created = Organization {
            id: Uuid::new_v4(),
            name: org.name,
            address: org.address,
            work_location: org.work_location,
            created_at: now,
            updated_at: now,
        };
        self.state
            .lock()
            .unwrap()
            .organizations
            .push(created.clone());
        Ok(created)
    }

    async fn get_customer(&self, id: Uuid) -> TemporaResult<Option<Customer>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .customers
            .iter()
            .find(|c| c.id == id)
            .cloned())
    }

    async fn update_customer(&self, id: Uuid, fields: &CustomerFields) -> TemporaResult<Customer> {
        let mut state = self.state.lock().unwrap();
        if state.failing_customer_names.contains(&fields.name) {
            return Err(TemporaError::Database(format!(
                "injected failure for {}",
                fields.name
            )));
        }
        let customer = state
            .customers
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| TemporaError::NotFound(format!("customer not found: {id}")))?;
        customer.organization_id = fields.organization_id;
        customer.name = fields.name.clone();
        customer.description = fields.description.clone();
        customer.contact_email = fields.contact_email.clone();
        customer.contact_phone = fields.contact_phone.clone();
        customer.address = fields.address.clone();
        customer.work_location = fields.work_location.clone();
        customer.is_active = fields.is_active;
        customer.updated_at = Utc::now();
        Ok(customer.clone())
    }
}
