use serde::Serialize;
use tempora_common::error::TemporaError;

use crate::partner::error::PartnerError;
use crate::sync::error::SyncError;

/// Uniform result envelope returned by every `SyncService` operation.
///
/// Serializes as `{success, data}` on success and
/// `{success: false, error: {code, message}}` on failure. A partial outcome
/// carries both `data` and `error`.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl ErrorBody {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl From<PartnerError> for ErrorBody {
    fn from(err: PartnerError) -> Self {
        Self::new(err.code(), err.to_string())
    }
}

impl From<SyncError> for ErrorBody {
    fn from(err: SyncError) -> Self {
        Self::new(err.code(), err.to_string())
    }
}

impl From<TemporaError> for ErrorBody {
    fn from(err: TemporaError) -> Self {
        Self::new(err.code(), err.to_string())
    }
}

impl<T> ServiceResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(error: impl Into<ErrorBody>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }

    pub fn partial(data: T, error: ErrorBody) -> Self {
        Self {
            success: false,
            data: Some(data),
            error: Some(error),
        }
    }

    pub fn from_result<E: Into<ErrorBody>>(result: Result<T, E>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::err(e),
        }
    }
}
