use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{FromRequestParts, Path, Request, State};
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::debug;

use crate::db::Store;
use crate::middleware::guards::{GuardChain, GuardInput};
use crate::service::SessionResolver;

/// Session token from the `Authorization` header.
///
/// Accepts either the bare token or `Bearer <token>`. An absent or blank
/// header yields `None`; a header that is not valid UTF-8 is kept (lossily)
/// so it resolves as an invalid session rather than as anonymous.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(AUTHORIZATION)?;
    let value = String::from_utf8_lossy(raw.as_bytes());
    let value = value.trim_start();
    let token = match value.split_once(' ') {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest,
        _ if value.trim_end().eq_ignore_ascii_case("bearer") => "",
        _ => value,
    }
    .trim();
    (!token.is_empty()).then(|| token.to_string())
}

/// State handed to one route's guard layer.
#[derive(Clone)]
pub struct GuardLayerState {
    pub store: Store,
    pub sessions: SessionResolver,
    pub chain: Arc<GuardChain>,
}

/// Runs the route's guard chain and stores the resulting `RequestContext`
/// in the request extensions for the handler's extractors.
pub async fn run_guards(
    State(state): State<GuardLayerState>,
    req: Request,
    next: Next,
) -> Response {
    let (mut parts, body) = req.into_parts();

    let params = match Path::<HashMap<String, String>>::from_request_parts(&mut parts, &()).await
    {
        Ok(Path(params)) => params,
        Err(_) => HashMap::new(),
    };
    let bearer = bearer_token(&parts.headers);
    let input = GuardInput {
        bearer: bearer.as_deref(),
        params: &params,
    };

    match state.chain.run(&state.store, &state.sessions, &input).await {
        Ok(ctx) => {
            parts.extensions.insert(ctx);
            next.run(Request::from_parts(parts, body)).await
        }
        Err(err) => {
            debug!(path = %parts.uri.path(), error = %err, "request rejected by guard");
            err.into_response()
        }
    }
}
