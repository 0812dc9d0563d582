use std::any::Any;
use std::sync::Arc;

use axum::{
    Router, middleware,
    response::{IntoResponse, Response},
    routing::{MethodRouter, delete, get, post},
};
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};

use crate::config::Config;
use crate::db::Store;
use crate::error::KeeperError;
use crate::handlers::{applications, auth, oauth, tokens, usage, users};
use crate::middleware::auth::{GuardLayerState, run_guards};
use crate::middleware::{ChainError, Guard, GuardChain};
use crate::oauth::Providers;
use crate::service::{AccountService, SessionResolver};

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub sessions: SessionResolver,
    pub accounts: AccountService,
    pub providers: Providers,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Store, providers: Providers, config: Config) -> Self {
        let sessions = SessionResolver::new(store.clone());
        let accounts = AccountService::new(store.clone(), sessions.clone());
        Self {
            store,
            sessions,
            accounts,
            providers,
            config: Arc::new(config),
        }
    }
}

const USER_PARAM: &str = "user_id";
const APPLICATION_PARAM: &str = "application_id";

// Guard chains, one per access level.
const USER_SELF: &[Guard] = &[
    Guard::OptionalAuthenticate,
    Guard::ResolveTargetUser(USER_PARAM),
    Guard::RequireSelf,
];

const AUTHENTICATED: &[Guard] = &[Guard::OptionalAuthenticate, Guard::RequireAuthenticated];

const APPLICATION_PUBLIC: &[Guard] = &[Guard::ResolveApplication(APPLICATION_PARAM)];

const APPLICATION_OWNER: &[Guard] = &[
    Guard::OptionalAuthenticate,
    Guard::RequireAuthenticated,
    Guard::ResolveApplication(APPLICATION_PARAM),
    Guard::RequireApplicationOwner,
];

fn guarded(
    state: &AppState,
    guards: &[Guard],
    route: MethodRouter<AppState>,
) -> Result<MethodRouter<AppState>, ChainError> {
    let layer_state = GuardLayerState {
        store: state.store.clone(),
        sessions: state.sessions.clone(),
        chain: Arc::new(GuardChain::new(guards)?),
    };
    Ok(route.route_layer(middleware::from_fn_with_state(layer_state, run_guards)))
}

fn panic_response(_: Box<dyn Any + Send + 'static>) -> Response {
    KeeperError::Internal("handler panicked".to_string()).into_response()
}

/// Builds the HTTP surface. Fails when a route's guard chain reads a
/// context slot that no earlier guard fills.
pub fn app_router(state: AppState) -> Result<Router, ChainError> {
    let s = &state;
    let router = Router::new()
        .route("/ping", get(auth::ping))
        .route("/auth/signup", post(auth::signup))
        .route("/auth/login", post(auth::login))
        .route("/auth/discord", post(oauth::discord_callback))
        .route("/auth/github", post(oauth::github_callback))
        .route(
            "/users/{user_id}",
            guarded(s, USER_SELF, get(users::get_user))?,
        )
        .route(
            "/users/{user_id}/applications",
            guarded(s, USER_SELF, get(users::get_user_applications))?,
        )
        .route(
            "/applications",
            guarded(s, AUTHENTICATED, post(applications::create_application))?,
        )
        .route(
            "/applications/{application_id}",
            guarded(s, APPLICATION_PUBLIC, get(applications::get_application))?,
        )
        .route(
            "/applications/{application_id}",
            guarded(s, APPLICATION_OWNER, post(applications::update_application))?,
        )
        .route(
            "/applications/{application_id}",
            guarded(s, APPLICATION_OWNER, delete(applications::delete_application))?,
        )
        .route(
            "/applications/{application_id}/tokens",
            guarded(s, APPLICATION_OWNER, get(tokens::list_tokens))?,
        )
        .route(
            "/applications/{application_id}/tokens",
            guarded(s, APPLICATION_OWNER, post(tokens::create_token))?,
        )
        .route(
            "/applications/{application_id}/tokens/{token_id}",
            guarded(s, APPLICATION_OWNER, delete(tokens::delete_token))?,
        )
        .route(
            "/applications/{application_id}/usage",
            guarded(s, APPLICATION_OWNER, get(usage::get_usage))?,
        );

    let mut router = router.layer(CatchPanicLayer::custom(panic_response));
    if state.config.is_development() {
        router = router
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive());
    }
    Ok(router.with_state(state))
}
