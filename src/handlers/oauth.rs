use axum::{
    Json,
    extract::{Query, State},
};
use tracing::info;

use crate::db::{AccountKind, Session};
use crate::error::KeeperError;
use crate::router::AppState;
use crate::types::requests::OauthCallbackQuery;

/// POST /auth/discord?code=... -> signs in (or up) with a Discord authorization code.
pub async fn discord_callback(
    State(state): State<AppState>,
    Query(query): Query<OauthCallbackQuery>,
) -> Result<Json<Session>, KeeperError> {
    provider_callback(&state, AccountKind::Discord, query).await
}

/// POST /auth/github?code=... -> signs in (or up) with a GitHub authorization code.
pub async fn github_callback(
    State(state): State<AppState>,
    Query(query): Query<OauthCallbackQuery>,
) -> Result<Json<Session>, KeeperError> {
    provider_callback(&state, AccountKind::Github, query).await
}

async fn provider_callback(
    state: &AppState,
    kind: AccountKind,
    query: OauthCallbackQuery,
) -> Result<Json<Session>, KeeperError> {
    let code = query
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| KeeperError::validation("Missing code query parameter"))?;

    let provider = state
        .providers
        .get(kind)
        .ok_or_else(|| KeeperError::Integrity(format!("no identity provider for {kind}")))?;

    let email = provider.verified_email(&code).await?;
    let session = state.accounts.login_with_provider(kind, &email).await?;
    info!(provider = %kind, user = %session.user_id, "OAuth callback completed");
    Ok(Json(session))
}
