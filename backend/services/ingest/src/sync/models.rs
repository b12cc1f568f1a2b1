use serde::Serialize;

use tempora_db::crm::models::OrganizationRef;
use tempora_db::external::models::{
    ExternalOrganization, ExternalOrganizationStatus, SyncStatus,
};

use crate::response::ErrorBody;

/// Outcome of one organization run.
#[derive(Debug, Clone, Serialize)]
pub struct SyncSummary {
    pub organization: String,
    pub organization_code: String,
    pub local_organization: OrganizationRef,
    pub synced: usize,
    pub updated: usize,
    pub errors: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CatalogInit {
    pub total: usize,
    pub created: usize,
    pub organizations: Vec<ExternalOrganization>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResetSummary {
    pub organization_code: String,
    pub deleted_clients: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusSummary {
    pub total: usize,
    pub pending: usize,
    pub syncing: usize,
    pub completed: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncStatusReport {
    pub organizations: Vec<ExternalOrganizationStatus>,
    pub summary: StatusSummary,
}

impl SyncStatusReport {
    pub fn new(organizations: Vec<ExternalOrganizationStatus>) -> Self {
        let mut summary = StatusSummary {
            total: organizations.len(),
            ..StatusSummary::default()
        };
        for status in &organizations {
            match status.organization.sync_status {
                SyncStatus::Pending => summary.pending += 1,
                SyncStatus::Syncing => summary.syncing += 1,
                SyncStatus::Completed => summary.completed += 1,
                SyncStatus::Failed => summary.failed += 1,
            }
        }
        Self {
            organizations,
            summary,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Success,
    Error,
}

/// Per-code result inside a bulk run.
#[derive(Debug, Clone, Serialize)]
pub struct SyncAllEntry {
    pub code: String,
    pub status: EntryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<SyncSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl SyncAllEntry {
    pub fn success(code: &str, summary: SyncSummary) -> Self {
        Self {
            code: code.to_string(),
            status: EntryStatus::Success,
            data: Some(summary),
            error: None,
        }
    }

    pub fn failure(code: &str, error: ErrorBody) -> Self {
        Self {
            code: code.to_string(),
            status: EntryStatus::Error,
            data: None,
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncAllSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncAllReport {
    pub summary: SyncAllSummary,
    pub results: Vec<SyncAllEntry>,
}

impl SyncAllReport {
    pub fn new(results: Vec<SyncAllEntry>) -> Self {
        let successful = results
            .iter()
            .filter(|r| r.status == EntryStatus::Success)
            .count();
        Self {
            summary: SyncAllSummary {
                total: results.len(),
                successful,
                failed: results.len() - successful,
            },
            results,
        }
    }

    pub fn is_success(&self) -> bool {
        self.summary.failed == 0
    }
}
