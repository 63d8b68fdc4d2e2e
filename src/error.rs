use reqwest::StatusCode;
use thiserror::Error;

pub const NETWORK_ERROR_MESSAGE: &str = "Unexpected error occurred";
pub const MALFORMED_BODY_MESSAGE: &str = "Malformed response body";

/// Everything a caller of the API gateway has to handle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The server answered with a non-2xx status.
    #[error("{message}")]
    Http { status: StatusCode, message: String },

    /// No response arrived at all.
    #[error("{message}")]
    Network { message: String },
}

impl ApiError {
    /// Builds an `Http` error, preferring the `message` field of a JSON body.
    pub fn from_response_body(status: StatusCode, body: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|json| {
                json.get("message")
                    .and_then(|value| value.as_str())
                    .filter(|text| !text.trim().is_empty())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| format!("Request failed with status {}", status.as_u16()));

        ApiError::Http { status, message }
    }

    pub fn malformed_body(status: StatusCode) -> Self {
        ApiError::Http {
            status,
            message: MALFORMED_BODY_MESSAGE.to_string(),
        }
    }

    pub fn network() -> Self {
        ApiError::Network {
            message: NETWORK_ERROR_MESSAGE.to_string(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ApiError::Http { message, .. } | ApiError::Network { message } => message,
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            ApiError::Network { .. } => None,
        }
    }
}
