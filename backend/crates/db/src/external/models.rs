use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::crm::models::OrganizationRef;

/// Per-organization sync state.
///
/// `pending → syncing → completed | failed`; a finished run (completed or
/// failed) may re-enter `syncing`. `syncing` never re-enters itself.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Pending,
    Syncing,
    Completed,
    Failed,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Syncing => "syncing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Whether a new run may start from this state.
    pub fn can_start_sync(&self) -> bool {
        !matches!(self, Self::Syncing)
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(Self::Pending),
            "syncing" => Ok(Self::Syncing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("unknown sync status: {value}")),
        }
    }
}

/// Per-record status of a shadow client row.
pub const CLIENT_STATUS_SYNCED: &str = "synced";
/// Set once a local customer has been derived and linked.
pub const CLIENT_STATUS_TRANSFORMED: &str = "transformed";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalOrganization {
    pub id: Uuid,
    pub external_code: String,
    pub external_name: String,
    pub local_organization_id: Option<Uuid>,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub sync_status: SyncStatus,
    pub sync_error: Option<String>,
    pub clients_count: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An external organization together with its linked local organization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalOrganizationStatus {
    pub organization: ExternalOrganization,
    pub local_organization: Option<OrganizationRef>,
}

/// Normalized fields projected from a partner payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientFields {
    pub company_name: Option<String>,
    pub accounting_code: Option<String>,
    pub vat_number: Option<String>,
    pub address: Option<String>,
    pub postal_code: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub phone: Option<String>,
    pub institutional_email: Option<String>,
    pub administrative_email: Option<String>,
    pub is_client: bool,
    pub is_supplier: bool,
    pub is_prospect: bool,
}

/// What an upsert writes: the verbatim payload plus its projection.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientSnapshot {
    pub external_id: i64,
    pub external_data: serde_json::Value,
    pub fields: ClientFields,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalClient {
    pub id: Uuid,
    pub external_organization_id: Uuid,
    pub external_id: i64,
    pub local_customer_id: Option<Uuid>,
    pub external_data: serde_json::Value,
    pub fields: ClientFields,
    pub last_sync_at: DateTime<Utc>,
    pub sync_status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
}
