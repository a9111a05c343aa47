use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use utoipa::ToSchema;

use crate::token::TokenError;

/// Everything that can abort the Microsoft login flow.
///
/// Each variant is terminal for the request; nothing is retried and no
/// cookie is touched on the way out.
#[derive(Debug, Error)]
pub enum LoginError {
    #[error("missing `source` parameter")]
    MissingSource,
    #[error("source URL rejected: {0}")]
    InvalidSource(String),
    #[error("missing authorization code")]
    MissingCode,
    #[error("login flow cookies are missing or expired")]
    MissingFlowCookie,
    #[error("state parameter does not match the login attempt")]
    StateMismatch,
    #[error("authorization code exchange failed: {0}")]
    Exchange(String),
    #[error("profile request failed: {0}")]
    Upstream(String),
    #[error("profile response could not be read: {0}")]
    ProfileRead(String),
    #[error("profile response could not be decoded: {0}")]
    ProfileDecode(#[from] serde_json::Error),
    #[error(transparent)]
    Signing(#[from] TokenError),
}

impl LoginError {
    pub fn status(&self) -> StatusCode {
        match self {
            LoginError::Exchange(_) => StatusCode::UNAUTHORIZED,
            LoginError::MissingSource
            | LoginError::InvalidSource(_)
            | LoginError::MissingCode
            | LoginError::MissingFlowCookie
            | LoginError::StateMismatch
            | LoginError::Upstream(_) => StatusCode::BAD_REQUEST,
            LoginError::ProfileRead(_)
            | LoginError::ProfileDecode(_)
            | LoginError::Signing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            LoginError::MissingSource | LoginError::InvalidSource(_) => "invalid_source",
            LoginError::MissingCode => "invalid_request",
            LoginError::MissingFlowCookie | LoginError::StateMismatch => "invalid_state",
            LoginError::Exchange(_) => "access_denied",
            LoginError::Upstream(_) => "upstream_error",
            _ => "server_error",
        }
    }
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
    #[error("in-flight requests did not finish within {0:?}")]
    ShutdownTimeout(Duration),
}

/// JSON body returned with every flow failure.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
}

impl IntoResponse for LoginError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "login flow aborted");
        } else {
            tracing::warn!(error = %self, "login flow rejected");
        }

        // Internal details stay in the log.
        let error_description = if status.is_server_error() {
            None
        } else {
            Some(self.to_string())
        };

        let body = ErrorBody {
            error: self.code().to_string(),
            error_description,
        };
        (status, Json(body)).into_response()
    }
}
