use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use tracing::info;

use crate::db::Token;
use crate::error::KeeperError;
use crate::middleware::TargetApplication;
use crate::middleware::body::ValidatedJson;
use crate::router::AppState;
use crate::service::secrets::{SECRET_BYTES, TOKEN_ID_BYTES, random_hex};
use crate::types::requests::{ListQuery, TokenRequest};
use crate::types::sort::{SortDirection, TokenSort};

/// GET /applications/{id}/tokens?sort=name&direction=ascending
pub async fn list_tokens(
    State(state): State<AppState>,
    TargetApplication(application): TargetApplication,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Token>>, KeeperError> {
    let sort = query
        .sort
        .as_deref()
        .map(str::parse::<TokenSort>)
        .transpose()?
        .unwrap_or_default();
    let direction = query
        .direction
        .as_deref()
        .map(str::parse::<SortDirection>)
        .transpose()?
        .unwrap_or_default();

    let tokens = state
        .store
        .list_tokens_by_application(&application.id, sort, direction)
        .await?;
    Ok(Json(tokens))
}

/// POST /applications/{id}/tokens
pub async fn create_token(
    State(state): State<AppState>,
    TargetApplication(application): TargetApplication,
    ValidatedJson(body): ValidatedJson<TokenRequest>,
) -> Result<(StatusCode, Json<Token>), KeeperError> {
    let now = Utc::now();
    let token = Token {
        id: random_hex(TOKEN_ID_BYTES)?,
        name: body.name,
        token: random_hex(SECRET_BYTES)?,
        total_requests: 0,
        application_id: application.id,
        created_at: now,
        last_used_at: now,
    };
    state.store.insert_token(&token).await?;
    info!(application = %token.application_id, token = %token.id, "token created");
    Ok((StatusCode::CREATED, Json(token)))
}

/// DELETE /applications/{id}/tokens/{token_id}
///
/// A token belonging to another application is reported as absent.
pub async fn delete_token(
    State(state): State<AppState>,
    TargetApplication(application): TargetApplication,
    Path((_, token_id)): Path<(String, String)>,
) -> Result<StatusCode, KeeperError> {
    let token = state
        .store
        .get_token(&token_id)
        .await?
        .filter(|t| t.application_id == application.id)
        .ok_or_else(|| KeeperError::not_found("No token was found by that ID"))?;

    state.store.delete_token(&token.id).await?;
    info!(application = %application.id, token = %token.id, "token deleted");
    Ok(StatusCode::OK)
}
