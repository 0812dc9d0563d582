use axum::{Json, extract::State, http::StatusCode};

use crate::db::Session;
use crate::error::KeeperError;
use crate::middleware::body::ValidatedJson;
use crate::router::AppState;
use crate::types::requests::{LoginRequest, SignupRequest};

/// GET /ping -> plain liveness probe.
pub async fn ping() -> StatusCode {
    StatusCode::OK
}

/// POST /auth/signup -> creates a local identity and returns its first session.
pub async fn signup(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<SignupRequest>,
) -> Result<(StatusCode, Json<Session>), KeeperError> {
    let session = state.accounts.signup(&body.email, &body.password).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// POST /auth/login -> password login for local identities.
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<LoginRequest>,
) -> Result<Json<Session>, KeeperError> {
    let session = state.accounts.login(&body.email, &body.password).await?;
    Ok(Json(session))
}
