use derive_more::Display;
use reqwest::StatusCode;
use serde::Deserialize;

use crate::timekeeping::{GateError, ValidationError};

#[derive(Debug, Display)]
pub enum ClientError {
    #[display(fmt = "Not signed in")]
    NotAuthenticated,

    #[display(fmt = "{}", _0)]
    Validation(ValidationError),

    #[display(fmt = "{}", _0)]
    Gate(GateError),

    /// Non-success response; `detail` is the server's message when it sent one.
    #[display(fmt = "{}", detail)]
    Api { status: StatusCode, detail: String },

    #[display(fmt = "Request failed: {}", _0)]
    Transport(reqwest::Error),

    #[display(fmt = "{} is already in progress", _0)]
    Busy(String),
}

impl std::error::Error for ClientError {}

impl From<ValidationError> for ClientError {
    fn from(e: ValidationError) -> Self {
        ClientError::Validation(e)
    }
}

impl From<GateError> for ClientError {
    fn from(e: GateError) -> Self {
        ClientError::Gate(e)
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        ClientError::Transport(e)
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: String,
}

/// Server `detail` if the body carries one, otherwise a generic message.
pub(crate) fn detail_from_body(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.detail)
        .unwrap_or_else(|_| format!("Request failed with status {}", status.as_u16()))
}

impl ClientError {
    pub(crate) async fn from_response(resp: reqwest::Response) -> Self {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        let detail = detail_from_body(status, &body);
        log::warn!("API error {}: {}", status, detail);
        ClientError::Api { status, detail }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_is_taken_from_the_body() {
        assert_eq!(
            detail_from_body(StatusCode::NOT_FOUND, r#"{"detail":"Timesheet not found"}"#),
            "Timesheet not found"
        );
    }

    #[test]
    fn missing_detail_falls_back_to_status() {
        assert_eq!(
            detail_from_body(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>"),
            "Request failed with status 502"
        );
        assert_eq!(
            detail_from_body(StatusCode::NOT_FOUND, r#"{"message":"nope"}"#),
            "Request failed with status 404"
        );
    }
}
