use axum::{
    Json,
    extract::{Query, State},
};

use crate::db::{Application, Identity};
use crate::error::KeeperError;
use crate::middleware::TargetUser;
use crate::router::AppState;
use crate::types::requests::ListQuery;
use crate::types::sort::{ApplicationSort, SortDirection};

/// GET /users/{id|@me}
pub async fn get_user(TargetUser(user): TargetUser) -> Json<Identity> {
    Json(user)
}

/// GET /users/{id}/applications?sort=name&direction=ascending
pub async fn get_user_applications(
    State(state): State<AppState>,
    TargetUser(user): TargetUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Application>>, KeeperError> {
    let sort = query
        .sort
        .as_deref()
        .map(str::parse::<ApplicationSort>)
        .transpose()?
        .unwrap_or_default();
    let direction = query
        .direction
        .as_deref()
        .map(str::parse::<SortDirection>)
        .transpose()?
        .unwrap_or_default();

    let applications = state
        .store
        .list_applications_by_user(&user.id, sort, direction)
        .await?;
    Ok(Json(applications))
}
