use tempora_config::OrganizationEntry;

use crate::partner::error::{PartnerError, PartnerResult};

/// The partner organizations this deployment knows how to sync.
#[derive(Debug, Clone)]
pub struct ExternalCatalog {
    entries: Vec<OrganizationEntry>,
}

impl ExternalCatalog {
    pub fn new(entries: Vec<OrganizationEntry>) -> Self {
        Self { entries }
    }

    pub fn organizations(&self) -> &[OrganizationEntry] {
        &self.entries
    }

    pub fn get(&self, code: &str) -> Option<&OrganizationEntry> {
        self.entries.iter().find(|e| e.code == code)
    }

    /// Look up `code`, failing with `UnknownOrganization` if it is not listed.
    pub fn validate(&self, code: &str) -> PartnerResult<&OrganizationEntry> {
        self.get(code)
            .ok_or_else(|| PartnerError::UnknownOrganization(code.to_string()))
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.code.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
