use tempora_common::error::TemporaError;

use crate::partner::error::PartnerError;

/// Run-level failure of a sync or administrative operation.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("external organization not found: {0}")]
    NotFound(String),

    #[error("sync already in progress for organization {0}")]
    InProgress(String),

    #[error(transparent)]
    Fetch(#[from] PartnerError),

    #[error(transparent)]
    Store(#[from] TemporaError),
}

impl SyncError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::InProgress(_) => "SYNC_IN_PROGRESS",
            Self::Fetch(e) => e.code(),
            Self::Store(e) => e.code(),
        }
    }
}

/// Failure confined to a single client record; counted, never fatal to the run.
#[derive(Debug, thiserror::Error)]
pub enum ClientSyncError {
    #[error("undecodable client payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("client {external_id}: {source}")]
    Store {
        external_id: i64,
        source: TemporaError,
    },
}
