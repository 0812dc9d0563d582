use axum::{
    Json,
    extract::{FromRequest, Request},
};
use serde::de::DeserializeOwned;

use crate::error::KeeperError;

/// Field-level checks run after a request body deserializes.
pub trait Validate {
    fn validate(&self) -> Result<(), KeeperError>;
}

/// JSON body that is both well-formed and valid; anything else is a 400.
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = KeeperError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(body) = Json::<T>::from_request(req, state).await.map_err(|rejection| {
            KeeperError::validation(format!("Invalid request body: {}", rejection.body_text()))
        })?;
        body.validate()?;
        Ok(Self(body))
    }
}
