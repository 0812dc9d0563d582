use crate::config::OauthClientConfig;
use crate::error::KeeperError;

use axum::http::StatusCode;
use oauth2::{
    AuthType, AuthorizationCode, Client as OAuth2Client, ClientId, ClientSecret, EndpointNotSet,
    EndpointSet, RedirectUrl, StandardRevocableToken, TokenResponse, TokenUrl,
    basic::{
        BasicErrorResponse, BasicRevocationErrorResponse, BasicTokenIntrospectionResponse,
        BasicTokenResponse,
    },
};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::info;

pub(super) const DISCORD_TOKEN_URI: &str = "https://discord.com/api/v10/oauth2/token";
pub(super) const DISCORD_USER_URI: &str = "https://discord.com/api/v10/users/@me";
pub(super) const GITHUB_TOKEN_URI: &str = "https://github.com/login/oauth/access_token";
pub(super) const GITHUB_EMAILS_URI: &str = "https://api.github.com/user/emails";

#[derive(Debug, Clone, Deserialize)]
pub struct DiscordUser {
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct GitHubEmail {
    pub email: String,
    #[serde(default)]
    pub primary: bool,
    #[serde(default)]
    pub verified: bool,
}

/// Stateless provider endpoints.
pub(super) struct ProviderEndpoints;

impl ProviderEndpoints {
    /// Exchange an authorization code for a provider access token.
    pub(super) async fn exchange_code(
        provider: &'static str,
        client: &ProviderOauth2Client,
        code: &str,
        http_client: &reqwest::Client,
    ) -> Result<String, KeeperError> {
        let token: BasicTokenResponse = client
            .exchange_code(AuthorizationCode::new(code.to_owned()))
            .request_async(http_client)
            .await
            .map_err(|e| upstream(provider, e))?;
        info!(provider, "authorization code exchanged");
        Ok(token.access_token().secret().to_string())
    }

    /// GET a provider resource with the bearer token and decode it.
    pub(super) async fn fetch_json<T: DeserializeOwned>(
        provider: &'static str,
        uri: &str,
        access_token: &str,
        http_client: &reqwest::Client,
    ) -> Result<T, KeeperError> {
        let resp = http_client
            .get(uri)
            .bearer_auth(access_token)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| upstream(provider, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(KeeperError::Upstream {
                provider,
                status: StatusCode::from_u16(status.as_u16()).ok(),
                detail: format!("unexpected status code: {}", status.as_u16()),
            });
        }

        resp.json::<T>().await.map_err(|e| upstream(provider, e))
    }
}

/// Attributes a transport or token-exchange failure to `provider`.
fn upstream(provider: &'static str, err: impl Into<KeeperError>) -> KeeperError {
    match err.into() {
        KeeperError::Reqwest(e) => KeeperError::Upstream {
            provider,
            status: e.status().and_then(|s| StatusCode::from_u16(s.as_u16()).ok()),
            detail: e.to_string(),
        },
        KeeperError::Oauth2Token(detail) => KeeperError::Upstream {
            provider,
            status: None,
            detail,
        },
        KeeperError::Oauth2Server { error } => KeeperError::Upstream {
            provider,
            status: None,
            detail: format!("token endpoint refused the code: {error}"),
        },
        other => other,
    }
}

/// Build the OAuth2 client for one provider registration.
///
/// Discord authenticates the client with HTTP Basic; GitHub expects the
/// credentials in the form body.
pub(super) fn build_oauth2_client(
    cfg: &OauthClientConfig,
    token_uri: &str,
    auth_type: AuthType,
) -> Result<ProviderOauth2Client, KeeperError> {
    let token_url = TokenUrl::new(token_uri.to_string())
        .map_err(|e| KeeperError::Internal(format!("invalid token url {token_uri}: {e}")))?;
    let mut client = OAuth2Client::new(ClientId::new(cfg.client_id.clone()))
        .set_client_secret(ClientSecret::new(cfg.secret.clone()))
        .set_token_uri(token_url)
        .set_auth_type(auth_type);
    if !cfg.redirect_uri.is_empty() {
        let redirect = RedirectUrl::new(cfg.redirect_uri.clone()).map_err(|e| {
            KeeperError::Internal(format!("invalid redirect uri {}: {e}", cfg.redirect_uri))
        })?;
        client = client.set_redirect_uri(redirect);
    }
    Ok(client)
}

pub(super) type ProviderOauth2Client = OAuth2Client<
    BasicErrorResponse,
    BasicTokenResponse,
    BasicTokenIntrospectionResponse,
    StandardRevocableToken,
    BasicRevocationErrorResponse,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointSet,
>;
