use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::db::{Application, Identity};
use crate::error::KeeperError;

/// Entities resolved for one request, filled in by the guard chain.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub caller: Option<Identity>,
    pub target_user: Option<Identity>,
    pub application: Option<Application>,
}

fn context(parts: &Parts) -> Result<&RequestContext, KeeperError> {
    parts
        .extensions
        .get::<RequestContext>()
        .ok_or_else(|| KeeperError::Integrity("route has no guard chain".to_string()))
}

fn missing(slot: &str) -> KeeperError {
    KeeperError::Integrity(format!("guard chain did not resolve the {slot}"))
}

/// The authenticated caller. Requires `RequireAuthenticated` in the chain.
#[derive(Debug, Clone)]
pub struct Caller(pub Identity);

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = KeeperError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ctx = context(parts)?;
        ctx.caller.clone().map(Self).ok_or_else(|| missing("caller"))
    }
}

#[derive(Debug, Clone)]
pub struct TargetUser(pub Identity);

impl<S> FromRequestParts<S> for TargetUser
where
    S: Send + Sync,
{
    type Rejection = KeeperError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ctx = context(parts)?;
        ctx.target_user
            .clone()
            .map(Self)
            .ok_or_else(|| missing("target user"))
    }
}

#[derive(Debug, Clone)]
pub struct TargetApplication(pub Application);

impl<S> FromRequestParts<S> for TargetApplication
where
    S: Send + Sync,
{
    type Rejection = KeeperError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ctx = context(parts)?;
        ctx.application
            .clone()
            .map(Self)
            .ok_or_else(|| missing("application"))
    }
}
