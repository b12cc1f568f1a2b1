use async_trait::async_trait;
use chrono::Utc;
use sqlx::{postgres::PgRow, PgExecutor, PgPool, Row};
use uuid::Uuid;

use crate::crm::models::{Customer, CustomerFields, NewOrganization, Organization};
use crate::crm::repositories::CrmRepository;
use tempora_common::error::{TemporaError, TemporaResult};

const ORGANIZATION_COLUMNS: &str = "id, name, address, work_location, created_at, updated_at";

const CUSTOMER_COLUMNS: &str = "id, organization_id, name, description, contact_email, \
     contact_phone, address, work_location, is_active, created_at, updated_at";

#[derive(Clone)]
pub struct PgCrmRepository {
    pool: PgPool,
}

impl PgCrmRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_organization(row: PgRow) -> Organization {
        Organization {
            id: row.get("id"),
            name: row.get("name"),
            address: row.get("address"),
            work_location: row.get("work_location"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }

    fn map_customer(row: PgRow) -> Customer {
        Customer {
            id: row.get("id"),
            organization_id: row.get("organization_id"),
            name: row.get("name"),
            description: row.get("description"),
            contact_email: row.get("contact_email"),
            contact_phone: row.get("contact_phone"),
            address: row.get("address"),
            work_location: row.get("work_location"),
            is_active: row.get("is_active"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }
}

/// Insert a customer through any executor, so callers can enlist it in a
/// wider transaction.
pub(crate) async fn insert_customer<'e, E>(executor: E, fields: &CustomerFields) -> TemporaResult<Customer>
where
    E: PgExecutor<'e>,
{
    let now = Utc::now();
    let row = sqlx::query(&format!(
        "insert into customers
         (id, organization_id, name, description, contact_email, contact_phone,
          address, work_location, is_active, created_at, updated_at)
         values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)
         returning {CUSTOMER_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(fields.organization_id)
    .bind(&fields.name)
    .bind(&fields.description)
    .bind(&fields.contact_email)
    .bind(&fields.contact_phone)
    .bind(&fields.address)
    .bind(&fields.work_location)
    .bind(fields.is_active)
    .bind(now)
    .fetch_one(executor)
    .await
    .map_err(|e| TemporaError::Database(e.to_string()))?;

    Ok(PgCrmRepository::map_customer(row))
}

#[async_trait]
impl CrmRepository for PgCrmRepository {
    async fn get_organization(&self, id: Uuid) -> TemporaResult<Option<Organization>> {
        let row = sqlx::query(&format!(
            "select {ORGANIZATION_COLUMNS} from organizations where id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| TemporaError::Database(e.to_string()))?;

        Ok(row.map(Self::map_organization))
    }

    async fn create_organization(&self, org: NewOrganization) -> TemporaResult<Organization> {
        let now = Utc::now();
        let row = sqlx::query(&format!(
            "insert into organizations (id, name, address, work_location, created_at, updated_at)
             values ($1, $2, $3, $4, $5, $5)
             returning {ORGANIZATION_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&org.name)
        .bind(&org.address)
        .bind(&org.work_location)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| TemporaError::Database(e.to_string()))?;

        Ok(Self::map_organization(row))
    }

    async fn get_customer(&self, id: Uuid) -> TemporaResult<Option<Customer>> {
        let row = sqlx::query(&format!(
            "select {CUSTOMER_COLUMNS} from customers where id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| TemporaError::Database(e.to_string()))?;

        Ok(row.map(Self::map_customer))
    }

    async fn update_customer(&self, id: Uuid, fields: &CustomerFields) -> TemporaResult<Customer> {
        let row = sqlx::query(&format!(
            "update customers
             set organization_id = $1, name = $2, description = $3, contact_email = $4,
                 contact_phone = $5, address = $6, work_location = $7, is_active = $8,
                 updated_at = $9
             where id = $10
             returning {CUSTOMER_COLUMNS}"
        ))
        .bind(fields.organization_id)
        .bind(&fields.name)
        .bind(&fields.description)
        .bind(&fields.contact_email)
        .bind(&fields.contact_phone)
        .bind(&fields.address)
        .bind(&fields.work_location)
        .bind(fields.is_active)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| TemporaError::Database(e.to_string()))?;

        row.map(Self::map_customer)
            .ok_or_else(|| TemporaError::NotFound(format!("customer not found: {id}")))
    }
}
