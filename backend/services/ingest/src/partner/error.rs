use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum PartnerError {
    #[error("OAuth 2.0 authentication failed: {message}")]
    Auth {
        status: Option<StatusCode>,
        message: String,
    },

    #[error("invalid organization code: {0}")]
    UnknownOrganization(String),

    #[error("HTTP {status}: {body}")]
    Http { status: StatusCode, body: String },

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("partner API reported failure: {0}")]
    Rejected(String),

    #[error("malformed partner response: {0}")]
    MalformedResponse(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl PartnerError {
    /// Stable machine-readable code used in service envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Auth { .. } => "AUTH_ERROR",
            Self::UnknownOrganization(_) => "UNKNOWN_ORGANIZATION",
            Self::Http { .. } | Self::Request(_) | Self::Rejected(_) => "EXTERNAL_API_ERROR",
            Self::MalformedResponse(_) => "MALFORMED_RESPONSE",
            Self::InvalidRequest(_) => "VALIDATION_ERROR",
        }
    }
}

pub type PartnerResult<T> = Result<T, PartnerError>;
