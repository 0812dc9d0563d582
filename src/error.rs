use axum::{Json, http::StatusCode, response::IntoResponse};
use oauth2::basic::BasicErrorResponseType;
use oauth2::reqwest::Error as ReqwestClientError;
use oauth2::{HttpClientError, RequestTokenError, StandardErrorResponse};
use serde::Serialize;
use sqlx::Error as SqlxError;
use std::time::Duration;
use thiserror::Error as ThisError;
use tracing::error;

#[derive(Debug, ThisError)]
pub enum KeeperError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Authentication(String),

    #[error("{0}")]
    Authorization(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Integrity error: {0}")]
    Integrity(String),

    #[error("{provider}: upstream error: {detail}")]
    Upstream {
        provider: &'static str,
        status: Option<StatusCode>,
        detail: String,
    },

    #[error("HTTP request error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("OAuth2 token request error: {0}")]
    Oauth2Token(String),

    #[error("OAuth2 server error: {error}")]
    Oauth2Server { error: String },

    #[error("Database error: {0}")]
    DatabaseError(#[from] SqlxError),

    #[error("Store call exceeded its {0:?} deadline")]
    StoreTimeout(Duration),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl KeeperError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            KeeperError::Validation(_) => StatusCode::BAD_REQUEST,
            KeeperError::Authentication(_) => StatusCode::UNAUTHORIZED,
            KeeperError::Authorization(_) => StatusCode::FORBIDDEN,
            KeeperError::NotFound(_) => StatusCode::NOT_FOUND,
            KeeperError::Conflict(_) => StatusCode::CONFLICT,
            KeeperError::Integrity(_)
            | KeeperError::Upstream { .. }
            | KeeperError::Reqwest(_)
            | KeeperError::Oauth2Token(_)
            | KeeperError::Oauth2Server { .. }
            | KeeperError::DatabaseError(_)
            | KeeperError::StoreTimeout(_)
            | KeeperError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Maps a failed insert onto `Conflict` when SQLite reports a unique-index hit.
    pub fn from_insert(e: SqlxError, what: &str) -> Self {
        match &e {
            SqlxError::Database(db) if db.is_unique_violation() => {
                KeeperError::Conflict(format!("A {what} already exists with that value"))
            }
            _ => KeeperError::DatabaseError(e),
        }
    }

    fn code(&self) -> &'static str {
        match self {
            KeeperError::Validation(_) => "BAD_REQUEST",
            KeeperError::Authentication(_) => "UNAUTHORIZED",
            KeeperError::Authorization(_) => "FORBIDDEN",
            KeeperError::NotFound(_) => "NOT_FOUND",
            KeeperError::Conflict(_) => "CONFLICT",
            KeeperError::Upstream { .. }
            | KeeperError::Reqwest(_)
            | KeeperError::Oauth2Token(_)
            | KeeperError::Oauth2Server { .. } => "UPSTREAM_ERROR",
            _ => "INTERNAL_ERROR",
        }
    }
}

impl
    From<
        RequestTokenError<
            HttpClientError<ReqwestClientError>,
            StandardErrorResponse<BasicErrorResponseType>,
        >,
    > for KeeperError
{
    fn from(
        e: RequestTokenError<
            HttpClientError<ReqwestClientError>,
            StandardErrorResponse<BasicErrorResponseType>,
        >,
    ) -> Self {
        match e {
            RequestTokenError::ServerResponse(err) => KeeperError::Oauth2Server {
                error: err.error().to_string(),
            },
            RequestTokenError::Request(req_e) => {
                KeeperError::Oauth2Token(format!("request failed: {}", req_e))
            }
            RequestTokenError::Parse(parse_err, _body) => {
                KeeperError::Oauth2Token(format!("unexpected token response: {}", parse_err))
            }
            RequestTokenError::Other(s) => KeeperError::Oauth2Token(s),
        }
    }
}

impl From<password_hash::Error> for KeeperError {
    fn from(e: password_hash::Error) -> Self {
        KeeperError::Internal(format!("password hashing failed: {e}"))
    }
}

impl From<getrandom::Error> for KeeperError {
    fn from(e: getrandom::Error) -> Self {
        KeeperError::Internal(format!("random source failed: {e}"))
    }
}

impl IntoResponse for KeeperError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let message = if status.is_server_error() {
            match &self {
                KeeperError::Upstream {
                    provider,
                    status: upstream_status,
                    detail,
                } => {
                    error!(
                        provider = %provider,
                        status = ?upstream_status,
                        detail = %detail,
                        "upstream provider call failed"
                    );
                }
                other => error!(error = %other, "request failed"),
            }
            "An internal server error occurred.".to_string()
        } else {
            self.to_string()
        };

        let body = ApiErrorBody {
            code: self.code().to_string(),
            message,
        };
        (status, Json(ApiErrorResponse { error: body })).into_response()
    }
}

/// Standardized API error response body
#[derive(Serialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}
