use axum::{Json, extract::State, http::StatusCode};
use chrono::Utc;
use tracing::info;

use crate::db::Application;
use crate::error::KeeperError;
use crate::middleware::body::ValidatedJson;
use crate::middleware::{Caller, TargetApplication};
use crate::router::AppState;
use crate::service::secrets::{APPLICATION_ID_BYTES, SECRET_BYTES, random_hex};
use crate::types::requests::ApplicationRequest;

/// POST /applications -> creates an application owned by the caller.
pub async fn create_application(
    State(state): State<AppState>,
    Caller(caller): Caller,
    ValidatedJson(body): ValidatedJson<ApplicationRequest>,
) -> Result<(StatusCode, Json<Application>), KeeperError> {
    let application = Application {
        id: random_hex(APPLICATION_ID_BYTES)?,
        name: body.name,
        short_description: body.short_description,
        user_id: caller.id,
        token: random_hex(SECRET_BYTES)?,
        total_requests: 0,
        created_at: Utc::now(),
    };
    state.store.insert_application(&application).await?;
    info!(application = %application.id, user = %application.user_id, "application created");
    Ok((StatusCode::CREATED, Json(application)))
}

/// GET /applications/{id}
pub async fn get_application(
    TargetApplication(application): TargetApplication,
) -> Json<Application> {
    Json(application)
}

/// POST /applications/{id} -> replaces name and description.
pub async fn update_application(
    State(state): State<AppState>,
    TargetApplication(application): TargetApplication,
    ValidatedJson(body): ValidatedJson<ApplicationRequest>,
) -> Result<StatusCode, KeeperError> {
    state
        .store
        .update_application_details(&application.id, &body.name, &body.short_description)
        .await?;
    Ok(StatusCode::OK)
}

/// DELETE /applications/{id}
pub async fn delete_application(
    State(state): State<AppState>,
    TargetApplication(application): TargetApplication,
) -> Result<StatusCode, KeeperError> {
    state.store.delete_application(&application.id).await?;
    info!(application = %application.id, "application deleted");
    Ok(StatusCode::OK)
}
