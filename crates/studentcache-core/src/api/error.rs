use reqwest::StatusCode;
use thiserror::Error;

/// Failure of one request against the academic API.
///
/// `endpoint` is the path below `/estudiantes/{id}/`, e.g.
/// `seguimiento-academico`, so a failure can be traced back to the bundle
/// field it was fetching.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{endpoint}: unauthorized, token may be expired")]
    Unauthorized { endpoint: String },

    #[error("{endpoint}: not found: {body}")]
    NotFound { endpoint: String, body: String },

    #[error("{endpoint}: still rate limited after {retries} retries")]
    RateLimited { endpoint: String, retries: u32 },

    #[error("{endpoint}: unexpected status {status}: {body}")]
    Status {
        endpoint: String,
        status: StatusCode,
        body: String,
    },

    #[error("{endpoint}: request failed: {source}")]
    Network {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Cut `body` to at most `MAX_ERROR_BODY_LENGTH` bytes on a char boundary
fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY_LENGTH {
        return body.to_string();
    }
    let cut = (0..=MAX_ERROR_BODY_LENGTH)
        .rev()
        .find(|&i| body.is_char_boundary(i))
        .unwrap_or(0);
    format!("{}... (truncated, {} total bytes)", &body[..cut], body.len())
}

impl ApiError {
    pub fn from_status(endpoint: &str, status: StatusCode, body: &str) -> Self {
        let endpoint = endpoint.to_string();
        match status {
            StatusCode::UNAUTHORIZED => ApiError::Unauthorized { endpoint },
            StatusCode::NOT_FOUND => ApiError::NotFound {
                endpoint,
                body: truncate_body(body),
            },
            status => ApiError::Status {
                endpoint,
                status,
                body: truncate_body(body),
            },
        }
    }

    /// HTTP status behind the error, if the server answered at all
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Unauthorized { .. } => Some(StatusCode::UNAUTHORIZED),
            ApiError::NotFound { .. } => Some(StatusCode::NOT_FOUND),
            ApiError::RateLimited { .. } => Some(StatusCode::TOO_MANY_REQUESTS),
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Network { .. } => None,
        }
    }
}
