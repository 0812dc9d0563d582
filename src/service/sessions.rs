use crate::db::{Identity, Session, Store};
use crate::error::KeeperError;
use crate::service::secrets::{SESSION_ID_BYTES, random_hex};
use chrono::Utc;
use tracing::info;

/// Outcome of looking up a bearer token.
///
/// `NoToken` and `Invalid` are kept apart: the first allows anonymous
/// continuation on optional-auth routes, the second must be rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionLookup {
    NoToken,
    Invalid,
    Authenticated(Identity),
}

#[derive(Clone)]
pub struct SessionResolver {
    store: Store,
}

impl SessionResolver {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Resolve `token` to the identity that owns it.
    ///
    /// A session whose owner no longer exists is an `Integrity` error.
    pub async fn resolve(&self, token: &str) -> Result<SessionLookup, KeeperError> {
        if token.is_empty() {
            return Ok(SessionLookup::NoToken);
        }

        let Some(session) = self.store.get_session(token).await? else {
            return Ok(SessionLookup::Invalid);
        };

        match self.store.get_identity(&session.user_id).await? {
            Some(identity) => Ok(SessionLookup::Authenticated(identity)),
            None => Err(KeeperError::Integrity(format!(
                "session references missing user {}",
                session.user_id
            ))),
        }
    }

    /// Issue a new session for `user_id`. Sessions never expire.
    pub async fn issue(&self, user_id: &str) -> Result<Session, KeeperError> {
        let session = Session {
            id: random_hex(SESSION_ID_BYTES)?,
            user_id: user_id.to_string(),
            created_at: Utc::now(),
        };
        self.store.insert_session(&session).await?;
        info!(user = %user_id, "session issued");
        Ok(session)
    }
}
