use appkeeper::db::{AccountKind, Store, UsageRecord};
use appkeeper::oauth::{GitHubEmail, IdentityProvider, Providers, select_primary_email};
use appkeeper::{AppState, Config, KeeperError, app_router};
use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use chrono::{TimeZone, Utc};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

/// Provider stand-in that answers every code with a fixed email list.
struct StubProvider {
    kind: AccountKind,
    emails: Vec<GitHubEmail>,
}

#[async_trait]
impl IdentityProvider for StubProvider {
    fn kind(&self) -> AccountKind {
        self.kind
    }

    async fn verified_email(&self, _code: &str) -> Result<String, KeeperError> {
        select_primary_email(&self.emails)
    }
}

fn primary(address: &str) -> GitHubEmail {
    GitHubEmail {
        email: address.to_string(),
        primary: true,
        verified: true,
    }
}

fn secondary(address: &str) -> GitHubEmail {
    GitHubEmail {
        email: address.to_string(),
        primary: false,
        verified: true,
    }
}

async fn test_app(discord: Vec<GitHubEmail>, github: Vec<GitHubEmail>) -> (Router, Store) {
    let store = Store::connect("sqlite::memory:", Duration::from_secs(5))
        .await
        .expect("failed to open in-memory store");

    let providers = Providers::new(
        Arc::new(StubProvider {
            kind: AccountKind::Discord,
            emails: discord,
        }),
        Arc::new(StubProvider {
            kind: AccountKind::Github,
            emails: github,
        }),
    );
    let state = AppState::new(store.clone(), providers, Config::default());
    let app = app_router(state).expect("route chains must be well ordered");
    (app, store)
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, token);
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("failed to build request");

    let resp = app.clone().oneshot(request).await.expect("request failed");
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("response body was not JSON")
    };
    (status, value)
}

async fn signup(app: &Router, email: &str) -> String {
    let (status, session) = send(
        app,
        "POST",
        "/auth/signup",
        None,
        Some(json!({
            "email": email,
            "password": "hunter22",
            "confirmPassword": "hunter22"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{session}");
    session["id"].as_str().expect("session id").to_string()
}

async fn create_application(app: &Router, token: &str) -> Value {
    let (status, application) = send(
        app,
        "POST",
        "/applications",
        Some(token),
        Some(json!({
            "name": "Weather bot",
            "shortDescription": "Posts the local forecast every morning at nine."
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{application}");
    application
}

#[tokio::test]
async fn signup_to_usage_end_to_end() {
    let (app, _) = test_app(vec![], vec![]).await;

    let (status, _) = send(&app, "GET", "/ping", None, None).await;
    assert_eq!(status, StatusCode::OK);

    let token = signup(&app, "ada@example.com").await;

    let (status, me) = send(&app, "GET", "/users/@me", Some(token.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "ada@example.com");
    assert_eq!(me["type"], "local");
    assert!(me.get("password").is_none());
    assert!(me.get("passwordHash").is_none());

    let application = create_application(&app, &token).await;
    assert_eq!(application["totalRequests"], 0);
    assert_eq!(application["user"], me["id"]);

    let uri = format!("/applications/{}/usage?step=4", application["id"].as_str().unwrap());
    let (status, buckets) = send(&app, "GET", &uri, Some(token.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    let buckets = buckets.as_array().expect("bucket list");
    assert_eq!(buckets.len(), 4);
    assert!(buckets.iter().all(|b| b["requestCount"] == 0));
}

#[tokio::test]
async fn usage_buckets_sum_records_in_each_window() {
    let (app, store) = test_app(vec![], vec![]).await;
    let token = signup(&app, "ada@example.com").await;
    let application = create_application(&app, &token).await;
    let app_id = application["id"].as_str().unwrap();

    for (ms, count) in [(500, 3), (2_500, 2)] {
        store
            .insert_usage_record(&UsageRecord {
                application_id: app_id.to_string(),
                timestamp: Utc.timestamp_millis_opt(ms).unwrap(),
                request_count: count,
            })
            .await
            .unwrap();
    }

    let uri = format!("/applications/{app_id}/usage?from=0&to=4000&step=4");
    let (status, buckets) = send(&app, "GET", &uri, Some(token.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    let counts: Vec<i64> = buckets
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["requestCount"].as_i64().unwrap())
        .collect();
    assert_eq!(counts, vec![3, 0, 2, 0]);
    assert_eq!(buckets[0]["timestamp"], "1970-01-01T00:00:00Z");
}

#[tokio::test]
async fn invalid_usage_ranges_are_rejected() {
    let (app, _) = test_app(vec![], vec![]).await;
    let token = signup(&app, "ada@example.com").await;
    let application = create_application(&app, &token).await;
    let app_id = application["id"].as_str().unwrap();

    for query in [
        "from=5000&to=1000",
        "from=0&to=1000&step=0",
        "from=0&to=1000&step=68719476736",
        "step=1001",
        "step=abc",
    ] {
        let uri = format!("/applications/{app_id}/usage?{query}");
        let (status, body) = send(&app, "GET", &uri, Some(token.as_str()), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{query}");
        assert_eq!(body["error"]["code"], "BAD_REQUEST");
    }
}

#[tokio::test]
async fn signup_twice_with_same_email_conflicts() {
    let (app, _) = test_app(vec![], vec![]).await;
    signup(&app, "ada@example.com").await;

    let (status, body) = send(
        &app,
        "POST",
        "/auth/signup",
        None,
        Some(json!({
            "email": "ada@example.com",
            "password": "another1",
            "confirmPassword": "another1"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");
}

#[tokio::test]
async fn signup_validation_and_malformed_bodies_are_bad_requests() {
    let (app, _) = test_app(vec![], vec![]).await;

    let (status, _) = send(
        &app,
        "POST",
        "/auth/signup",
        None,
        Some(json!({
            "email": "ada@example.com",
            "password": "hunter22",
            "confirmPassword": "hunter23"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "POST",
        "/auth/signup",
        None,
        Some(json!({ "email": "ada@example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn login_checks_password() {
    let (app, _) = test_app(vec![], vec![]).await;
    signup(&app, "ada@example.com").await;

    let (status, _) = send(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "email": "ada@example.com", "password": "wrong-one" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, session) = send(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "email": "ada@example.com", "password": "hunter22" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(session["id"].as_str().is_some_and(|id| !id.is_empty()));
}

#[tokio::test]
async fn github_without_primary_email_conflicts_and_creates_nothing() {
    let (app, store) = test_app(vec![], vec![secondary("ada@example.com")]).await;

    let (status, body) = send(&app, "POST", "/auth/github?code=abc", None, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");

    let identity = store.get_identity_by_email("ada@example.com").await.unwrap();
    assert!(identity.is_none());
}

#[tokio::test]
async fn provider_login_creates_identity_once() {
    let (app, store) = test_app(vec![], vec![primary("ada@example.com")]).await;

    let (status, first) = send(&app, "POST", "/auth/github?code=abc", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, second) = send(&app, "POST", "/auth/github?code=def", None, None).await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(first["user"], second["user"]);
    assert_ne!(first["id"], second["id"]);
    let identity = store
        .get_identity_by_email("ada@example.com")
        .await
        .unwrap()
        .expect("identity created on first login");
    assert_eq!(identity.kind, AccountKind::Github);
}

#[tokio::test]
async fn provider_login_for_local_email_is_forbidden() {
    let (app, _) = test_app(vec![primary("ada@example.com")], vec![]).await;
    signup(&app, "ada@example.com").await;

    let (status, _) = send(&app, "POST", "/auth/discord?code=abc", None, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn provider_login_without_code_is_bad_request() {
    let (app, _) = test_app(vec![primary("ada@example.com")], vec![]).await;

    let (status, _) = send(&app, "POST", "/auth/discord", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send(&app, "POST", "/auth/discord?code=", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn me_requires_a_valid_session() {
    let (app, _) = test_app(vec![], vec![]).await;

    let (status, body) = send(&app, "GET", "/users/@me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    // an empty bearer credential is no credential at all
    let (status, _) = send(&app, "GET", "/users/@me", Some("Bearer "), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "GET", "/users/@me", Some("not-a-session"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, "GET", "/users/deadbeefdeadbeef", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn profiles_and_application_lists_are_self_only() {
    let (app, _) = test_app(vec![], vec![]).await;
    let ada = signup(&app, "ada@example.com").await;
    let bob = signup(&app, "bob@example.com").await;
    create_application(&app, &ada).await;

    let (_, ada_me) = send(&app, "GET", "/users/@me", Some(ada.as_str()), None).await;
    let ada_id = ada_me["id"].as_str().unwrap();

    let profile_uri = format!("/users/{ada_id}");
    let (status, body) = send(&app, "GET", &profile_uri, None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.get("email").is_none());
    let (status, body) = send(&app, "GET", &profile_uri, Some(bob.as_str()), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body.get("email").is_none());
    let (status, profile) = send(&app, "GET", &profile_uri, Some(ada.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["email"], "ada@example.com");

    let list_uri = format!("/users/{ada_id}/applications");
    let (status, _) = send(&app, "GET", &list_uri, None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send(&app, "GET", &list_uri, Some(bob.as_str()), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, apps) = send(&app, "GET", &list_uri, Some(ada.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(apps.as_array().map(Vec::len), Some(1));

    let (status, _) = send(
        &app,
        "GET",
        "/users/@me/applications?sort=colour",
        Some(ada.as_str()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn only_the_owner_may_change_an_application() {
    let (app, store) = test_app(vec![], vec![]).await;
    let ada = signup(&app, "ada@example.com").await;
    let bob = signup(&app, "bob@example.com").await;
    let application = create_application(&app, &ada).await;
    let uri = format!("/applications/{}", application["id"].as_str().unwrap());

    let (status, fetched) = send(&app, "GET", &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["name"], "Weather bot");

    let update = json!({
        "name": "Forecast bot",
        "shortDescription": "Posts the regional forecast every morning at nine."
    });
    let (status, _) = send(&app, "POST", &uri, Some(bob.as_str()), Some(update.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, "DELETE", &uri, Some(bob.as_str()), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, "DELETE", &uri, None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "POST", &uri, Some(ada.as_str()), Some(update)).await;
    assert_eq!(status, StatusCode::OK);
    let (_, fetched) = send(&app, "GET", &uri, None, None).await;
    assert_eq!(fetched["name"], "Forecast bot");

    let (status, _) = send(&app, "DELETE", &uri, Some(ada.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "GET", &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(
        store
            .get_application(application["id"].as_str().unwrap())
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn tokens_are_managed_per_application() {
    let (app, _) = test_app(vec![], vec![]).await;
    let ada = signup(&app, "ada@example.com").await;
    let bob = signup(&app, "bob@example.com").await;
    let first = create_application(&app, &ada).await;
    let second = create_application(&app, &ada).await;
    let tokens_uri = format!("/applications/{}/tokens", first["id"].as_str().unwrap());

    let (status, token) = send(
        &app,
        "POST",
        &tokens_uri,
        Some(ada.as_str()),
        Some(json!({ "name": "ci" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(token["application"], first["id"]);
    assert_eq!(token["createdAt"], token["lastUsedAt"]);
    let token_id = token["id"].as_str().unwrap();

    let (status, _) = send(&app, "GET", &tokens_uri, Some(bob.as_str()), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // The token exists, but under a different application.
    let foreign = format!(
        "/applications/{}/tokens/{token_id}",
        second["id"].as_str().unwrap()
    );
    let (status, _) = send(&app, "DELETE", &foreign, Some(ada.as_str()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("{tokens_uri}/ffffffffffffffffffffffff"),
        Some(ada.as_str()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("{tokens_uri}/{token_id}"),
        Some(ada.as_str()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, listed) = send(&app, "GET", &tokens_uri, Some(ada.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed, json!([]));
}

#[tokio::test]
async fn short_application_description_is_rejected() {
    let (app, _) = test_app(vec![], vec![]).await;
    let ada = signup(&app, "ada@example.com").await;

    let (status, body) = send(
        &app,
        "POST",
        "/applications",
        Some(ada.as_str()),
        Some(json!({ "name": "Bot", "shortDescription": "too short" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}
