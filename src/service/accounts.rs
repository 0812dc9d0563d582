use crate::db::{AccountKind, Identity, Session, Store};
use crate::error::KeeperError;
use crate::service::secrets::{self, IDENTITY_ID_BYTES};
use crate::service::sessions::SessionResolver;
use chrono::Utc;
use tracing::info;

/// Signup, password login and provider login. Each successful call issues a session.
#[derive(Clone)]
pub struct AccountService {
    store: Store,
    sessions: SessionResolver,
}

impl AccountService {
    pub fn new(store: Store, sessions: SessionResolver) -> Self {
        Self { store, sessions }
    }

    /// Create a local identity for `email`. Emails match case-sensitively.
    pub async fn signup(&self, email: &str, password: &str) -> Result<Session, KeeperError> {
        if self.store.get_identity_by_email(email).await?.is_some() {
            return Err(KeeperError::Conflict(
                "A user already exists with that email address".to_string(),
            ));
        }

        let identity = Identity {
            id: secrets::random_hex(IDENTITY_ID_BYTES)?,
            email: email.to_string(),
            password_hash: Some(secrets::hash_password(password).await?),
            kind: AccountKind::Local,
            created_at: Utc::now(),
        };
        self.store.insert_identity(&identity).await?;
        info!(user = %identity.id, kind = %identity.kind, "identity created");

        self.sessions.issue(&identity.id).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Session, KeeperError> {
        let Some(identity) = self.store.get_identity_by_email(email).await? else {
            return Err(KeeperError::Authorization(
                "No user exists with that email address".to_string(),
            ));
        };

        if identity.kind != AccountKind::Local {
            return Err(KeeperError::Authorization(format!(
                "A user exists with that email but signs in with {}. Please log in with that provider instead.",
                identity.kind
            )));
        }

        let matches = match identity.password_hash.as_deref() {
            Some(hash) => secrets::verify_password(hash, password).await?,
            None => false,
        };
        if !matches {
            return Err(KeeperError::Authorization("Invalid password".to_string()));
        }

        self.sessions.issue(&identity.id).await
    }

    /// Sign in an identity vouched for by an OAuth provider, creating it on first use.
    ///
    /// Identities are never merged across providers: an existing identity of a
    /// different kind is rejected.
    pub async fn login_with_provider(
        &self,
        kind: AccountKind,
        email: &str,
    ) -> Result<Session, KeeperError> {
        let user_id = match self.store.get_identity_by_email(email).await? {
            Some(existing) if existing.kind != kind => {
                return Err(KeeperError::Authorization(format!(
                    "A user exists with that email but does not sign in with {kind}. Please use the original login method instead."
                )));
            }
            Some(existing) => existing.id,
            None => {
                let identity = Identity {
                    id: secrets::random_hex(IDENTITY_ID_BYTES)?,
                    email: email.to_string(),
                    password_hash: None,
                    kind,
                    created_at: Utc::now(),
                };
                self.store.insert_identity(&identity).await?;
                info!(user = %identity.id, kind = %kind, "identity created");
                identity.id
            }
        };

        self.sessions.issue(&user_id).await
    }
}
