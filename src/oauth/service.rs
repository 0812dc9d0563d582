use super::endpoints::{
    DISCORD_TOKEN_URI, DISCORD_USER_URI, DiscordUser, GITHUB_EMAILS_URI, GITHUB_TOKEN_URI,
    GitHubEmail, ProviderEndpoints, ProviderOauth2Client, build_oauth2_client,
};
use crate::config::Config;
use crate::db::AccountKind;
use crate::error::KeeperError;

use async_trait::async_trait;
use oauth2::AuthType;
use std::sync::Arc;
use std::time::Duration;

/// Turns an OAuth authorization code into the email address the provider vouches for.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    fn kind(&self) -> AccountKind;

    async fn verified_email(&self, code: &str) -> Result<String, KeeperError>;
}

pub struct DiscordProvider {
    client: ProviderOauth2Client,
    http: reqwest::Client,
}

#[async_trait]
impl IdentityProvider for DiscordProvider {
    fn kind(&self) -> AccountKind {
        AccountKind::Discord
    }

    async fn verified_email(&self, code: &str) -> Result<String, KeeperError> {
        let access_token =
            ProviderEndpoints::exchange_code("discord", &self.client, code, &self.http).await?;
        let user: DiscordUser =
            ProviderEndpoints::fetch_json("discord", DISCORD_USER_URI, &access_token, &self.http)
                .await?;
        user.email
            .filter(|email| !email.is_empty())
            .ok_or_else(|| KeeperError::Upstream {
                provider: "discord",
                status: None,
                detail: "missing email in user response".to_string(),
            })
    }
}

pub struct GitHubProvider {
    client: ProviderOauth2Client,
    http: reqwest::Client,
}

#[async_trait]
impl IdentityProvider for GitHubProvider {
    fn kind(&self) -> AccountKind {
        AccountKind::Github
    }

    async fn verified_email(&self, code: &str) -> Result<String, KeeperError> {
        let access_token =
            ProviderEndpoints::exchange_code("github", &self.client, code, &self.http).await?;
        let emails: Vec<GitHubEmail> =
            ProviderEndpoints::fetch_json("github", GITHUB_EMAILS_URI, &access_token, &self.http)
                .await?;
        select_primary_email(&emails)
    }
}

/// Pick the address GitHub marks as primary; having none is a conflict.
pub fn select_primary_email(emails: &[GitHubEmail]) -> Result<String, KeeperError> {
    emails
        .iter()
        .filter(|e| e.primary && !e.email.is_empty())
        .map(|e| e.email.clone())
        .next_back()
        .ok_or_else(|| {
            KeeperError::Conflict(
                "Cannot find a primary email address associated with that GitHub user".to_string(),
            )
        })
}

/// The configured identity providers, one per OAuth account kind.
#[derive(Clone)]
pub struct Providers {
    discord: Arc<dyn IdentityProvider>,
    github: Arc<dyn IdentityProvider>,
}

impl Providers {
    pub fn new(discord: Arc<dyn IdentityProvider>, github: Arc<dyn IdentityProvider>) -> Self {
        Self { discord, github }
    }

    pub fn from_config(cfg: &Config) -> Result<Self, KeeperError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("appkeeper/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(15))
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        let discord = DiscordProvider {
            client: build_oauth2_client(&cfg.discord, DISCORD_TOKEN_URI, AuthType::BasicAuth)?,
            http: http.clone(),
        };
        let github = GitHubProvider {
            client: build_oauth2_client(&cfg.github, GITHUB_TOKEN_URI, AuthType::RequestBody)?,
            http,
        };
        Ok(Self::new(Arc::new(discord), Arc::new(github)))
    }

    pub fn get(&self, kind: AccountKind) -> Option<&Arc<dyn IdentityProvider>> {
        match kind {
            AccountKind::Discord => Some(&self.discord),
            AccountKind::Github => Some(&self.github),
            AccountKind::Local => None,
        }
    }
}
