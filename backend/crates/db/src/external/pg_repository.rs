use std::str::FromStr;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{postgres::PgRow, PgPool, Row};
use uuid::Uuid;

use crate::crm::models::{Customer, CustomerFields, OrganizationRef};
use crate::crm::pg_repository::insert_customer;
use crate::external::models::{
    ClientFields, ClientSnapshot, ExternalClient, ExternalOrganization,
    ExternalOrganizationStatus, SyncStatus, UpsertOutcome, CLIENT_STATUS_SYNCED,
    CLIENT_STATUS_TRANSFORMED,
};
use crate::external::repositories::ExternalRepository;
use tempora_common::error::{TemporaError, TemporaResult};

const ORG_COLUMNS: &str = "id, external_code, external_name, local_organization_id, last_sync_at, \
     sync_status, sync_error, clients_count, is_active, created_at, updated_at";

const CLIENT_COLUMNS: &str = "id, external_organization_id, external_id, local_customer_id, \
     external_data, company_name, accounting_code, vat_number, address, postal_code, city, \
     province, phone, institutional_email, administrative_email, is_client, is_supplier, \
     is_prospect, last_sync_at, sync_status, created_at, updated_at";

#[derive(Clone)]
pub struct PgExternalRepository {
    pool: PgPool,
}

impl PgExternalRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_org_row(row: &PgRow) -> TemporaResult<ExternalOrganization> {
        let status_raw: String = row.get("sync_status");
        let sync_status = SyncStatus::from_str(&status_raw).map_err(TemporaError::Internal)?;

        Ok(ExternalOrganization {
            id: row.get("id"),
            external_code: row.get("external_code"),
            external_name: row.get("external_name"),
            local_organization_id: row.get("local_organization_id"),
            last_sync_at: row.get("last_sync_at"),
            sync_status,
            sync_error: row.get("sync_error"),
            clients_count: row.get("clients_count"),
            is_active: row.get("is_active"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }

    fn map_client_row(row: &PgRow) -> ExternalClient {
        ExternalClient {
            id: row.get("id"),
            external_organization_id: row.get("external_organization_id"),
            external_id: row.get("external_id"),
            local_customer_id: row.get("local_customer_id"),
            external_data: row.get("external_data"),
            fields: ClientFields {
                company_name: row.get("company_name"),
                accounting_code: row.get("accounting_code"),
                vat_number: row.get("vat_number"),
                address: row.get("address"),
                postal_code: row.get("postal_code"),
                city: row.get("city"),
                province: row.get("province"),
                phone: row.get("phone"),
                institutional_email: row.get("institutional_email"),
                administrative_email: row.get("administrative_email"),
                is_client: row.get("is_client"),
                is_supplier: row.get("is_supplier"),
                is_prospect: row.get("is_prospect"),
            },
            last_sync_at: row.get("last_sync_at"),
            sync_status: row.get("sync_status"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }
}

#[async_trait]
impl ExternalRepository for PgExternalRepository {
    async fn find_or_create_organization(
        &self,
        code: &str,
        name: &str,
    ) -> TemporaResult<(ExternalOrganization, bool)> {
        let inserted = sqlx::query(&format!(
            "insert into external_organizations (id, external_code, external_name, sync_status, is_active)
             values ($1, $2, $3, 'pending', true)
             on conflict (external_code) do nothing
             returning {ORG_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(code)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| TemporaError::Database(e.to_string()))?;

        if let Some(row) = inserted {
            return Ok((Self::map_org_row(&row)?, true));
        }

        let existing = self.get_organization_by_code(code).await?.ok_or_else(|| {
            TemporaError::Internal(format!(
                "external organization {code} vanished during find-or-create"
            ))
        })?;
        Ok((existing, false))
    }

    async fn get_organization_by_code(
        &self,
        code: &str,
    ) -> TemporaResult<Option<ExternalOrganization>> {
        let row = sqlx::query(&format!(
            "select {ORG_COLUMNS} from external_organizations where external_code = $1"
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| TemporaError::Database(e.to_string()))?;

        row.as_ref().map(Self::map_org_row).transpose()
    }

    async fn list_organizations(&self) -> TemporaResult<Vec<ExternalOrganizationStatus>> {
        let rows = sqlx::query(
            "select eo.id, eo.external_code, eo.external_name, eo.local_organization_id,
                    eo.last_sync_at, eo.sync_status, eo.sync_error, eo.clients_count,
                    eo.is_active, eo.created_at, eo.updated_at,
                    o.name as local_organization_name
             from external_organizations eo
             left join organizations o on o.id = eo.local_organization_id
             order by eo.external_code asc",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| TemporaError::Database(e.to_string()))?;

        rows.iter()
            .map(|row| {
                let organization = Self::map_org_row(row)?;
                let local_name: Option<String> = row.get("local_organization_name");
                let local_organization = organization
                    .local_organization_id
                    .zip(local_name)
                    .map(|(id, name)| OrganizationRef { id, name });
                Ok(ExternalOrganizationStatus {
                    organization,
                    local_organization,
                })
            })
            .collect()
    }

    async fn begin_sync(&self, id: Uuid) -> TemporaResult<Option<ExternalOrganization>> {
        let row = sqlx::query(&format!(
            "update external_organizations
             set sync_status = 'syncing', sync_error = null, updated_at = $1
             where id = $2 and is_active and sync_status <> 'syncing'
             returning {ORG_COLUMNS}"
        ))
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| TemporaError::Database(e.to_string()))?;

        row.as_ref().map(Self::map_org_row).transpose()
    }

    async fn mark_completed(
        &self,
        id: Uuid,
        clients_count: i32,
        local_organization_id: Uuid,
    ) -> TemporaResult<ExternalOrganization> {
        let now = Utc::now();
        let row = sqlx::query(&format!(
            "update external_organizations
             set sync_status = 'completed', last_sync_at = $1, clients_count = $2,
                 local_organization_id = $3, sync_error = null, updated_at = $1
             where id = $4
             returning {ORG_COLUMNS}"
        ))
        .bind(now)
        .bind(clients_count)
        .bind(local_organization_id)
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| TemporaError::Database(e.to_string()))?;

        Self::map_org_row(&row)
    }

    async fn set_local_organization(
        &self,
        id: Uuid,
        local_organization_id: Uuid,
    ) -> TemporaResult<()> {
        let result = sqlx::query(
            "update external_organizations
             set local_organization_id = $1, updated_at = $2
             where id = $3",
        )
        .bind(local_organization_id)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| TemporaError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(TemporaError::NotFound(format!(
                "external organization not found: {id}"
            )));
        }
        Ok(())
    }

    async fn mark_failed(
        &self,
        id: Uuid,
        error_message: &str,
    ) -> TemporaResult<ExternalOrganization> {
        let row = sqlx::query(&format!(
            "update external_organizations
             set sync_status = 'failed', sync_error = $1, updated_at = $2
             where id = $3
             returning {ORG_COLUMNS}"
        ))
        .bind(error_message)
        .bind(Utc::now())
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| TemporaError::Database(e.to_string()))?;

        Self::map_org_row(&row)
    }

    async fn reset_organization(&self, id: Uuid) -> TemporaResult<u64> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| TemporaError::Database(e.to_string()))?;

        let deleted = sqlx::query("delete from external_clients where external_organization_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| TemporaError::Database(e.to_string()))?
            .rows_affected();

        let updated = sqlx::query(
            "update external_organizations
             set sync_status = 'pending', last_sync_at = null, clients_count = 0,
                 sync_error = null, local_organization_id = null, updated_at = $1
             where id = $2",
        )
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| TemporaError::Database(e.to_string()))?;

        if updated.rows_affected() == 0 {
            return Err(TemporaError::NotFound(format!(
                "external organization not found: {id}"
            )));
        }

        tx.commit()
            .await
            .map_err(|e| TemporaError::Database(e.to_string()))?;

        Ok(deleted)
    }

    async fn upsert_client(
        &self,
        external_organization_id: Uuid,
        snapshot: &ClientSnapshot,
    ) -> TemporaResult<(ExternalClient, UpsertOutcome)> {
        let f = &snapshot.fields;
        let row = sqlx::query(&format!(
            "insert into external_clients
             (id, external_organization_id, external_id, external_data, company_name,
              accounting_code, vat_number, address, postal_code, city, province, phone,
              institutional_email, administrative_email, is_client, is_supplier, is_prospect,
              last_sync_at, sync_status, created_at, updated_at)
             values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17,
                     $18, '{CLIENT_STATUS_SYNCED}', $18, $18)
             on conflict (external_organization_id, external_id) do update set
               external_data = excluded.external_data,
               company_name = excluded.company_name,
               accounting_code = excluded.accounting_code,
               vat_number = excluded.vat_number,
               address = excluded.address,
               postal_code = excluded.postal_code,
               city = excluded.city,
               province = excluded.province,
               phone = excluded.phone,
               institutional_email = excluded.institutional_email,
               administrative_email = excluded.administrative_email,
               is_client = excluded.is_client,
               is_supplier = excluded.is_supplier,
               is_prospect = excluded.is_prospect,
               last_sync_at = excluded.last_sync_at,
               sync_status = case when external_clients.local_customer_id is null
                                  then '{CLIENT_STATUS_SYNCED}'
                                  else '{CLIENT_STATUS_TRANSFORMED}' end,
               updated_at = excluded.updated_at
             returning {CLIENT_COLUMNS}, (xmax = 0) as inserted"
        ))
        .bind(Uuid::new_v4())
        .bind(external_organization_id)
        .bind(snapshot.external_id)
        .bind(&snapshot.external_data)
        .bind(&f.company_name)
        .bind(&f.accounting_code)
        .bind(&f.vat_number)
        .bind(&f.address)
        .bind(&f.postal_code)
        .bind(&f.city)
        .bind(&f.province)
        .bind(&f.phone)
        .bind(&f.institutional_email)
        .bind(&f.administrative_email)
        .bind(f.is_client)
        .bind(f.is_supplier)
        .bind(f.is_prospect)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| TemporaError::Database(e.to_string()))?;

        let inserted: bool = row.get("inserted");
        let outcome = if inserted {
            UpsertOutcome::Created
        } else {
            UpsertOutcome::Updated
        };

        Ok((Self::map_client_row(&row), outcome))
    }

    async fn create_linked_customer(
        &self,
        client_id: Uuid,
        fields: &CustomerFields,
    ) -> TemporaResult<Customer> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| TemporaError::Database(e.to_string()))?;

        let customer = insert_customer(&mut *tx, fields).await?;

        let linked = sqlx::query(&format!(
            "update external_clients
             set local_customer_id = $1, sync_status = '{CLIENT_STATUS_TRANSFORMED}', updated_at = $2
             where id = $3"
        ))
        .bind(customer.id)
        .bind(Utc::now())
        .bind(client_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| TemporaError::Database(e.to_string()))?;

        if linked.rows_affected() == 0 {
            return Err(TemporaError::NotFound(format!(
                "external client not found: {client_id}"
            )));
        }

        tx.commit()
            .await
            .map_err(|e| TemporaError::Database(e.to_string()))?;

        Ok(customer)
    }
}
