use axum::{
    Json,
    extract::{Query, State},
};
use chrono::Utc;

use crate::error::KeeperError;
use crate::middleware::TargetApplication;
use crate::router::AppState;
use crate::service::usage::{UsageBucket, aggregate, check_window};
use crate::types::requests::UsageQuery;

/// GET /applications/{id}/usage?from=&to=&step= (millisecond epochs)
pub async fn get_usage(
    State(state): State<AppState>,
    TargetApplication(application): TargetApplication,
    Query(query): Query<UsageQuery>,
) -> Result<Json<Vec<UsageBucket>>, KeeperError> {
    let (from, to, step) = query.resolve(Utc::now())?;
    check_window(from, to, step)?;

    let records = state
        .store
        .list_usage_records(&application.id, from, to)
        .await?;
    Ok(Json(aggregate(&records, from, to, step)?))
}
