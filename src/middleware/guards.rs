//! Authorization guards and the chains that compose them.
//!
//! A guard reads the bearer token, the path parameters and the context built
//! so far. It either fills one context slot, passes, or rejects the request.
//! Guards only read from the store.

use std::collections::HashMap;
use std::fmt;

use thiserror::Error as ThisError;

use crate::db::Store;
use crate::error::KeeperError;
use crate::middleware::context::RequestContext;
use crate::service::{SessionLookup, SessionResolver};

/// Path value that stands for the authenticated caller.
pub const ME: &str = "@me";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    OptionalAuthenticate,
    /// Binds the target user from the named path parameter.
    ResolveTargetUser(&'static str),
    RequireAuthenticated,
    RequireSelf,
    /// Binds the target application from the named path parameter.
    ResolveApplication(&'static str),
    RequireApplicationOwner,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Caller,
    TargetUser,
    Application,
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Slot::Caller => "caller",
            Slot::TargetUser => "target user",
            Slot::Application => "application",
        })
    }
}

impl Guard {
    pub fn produces(self) -> Option<Slot> {
        match self {
            Guard::OptionalAuthenticate => Some(Slot::Caller),
            Guard::ResolveTargetUser(_) => Some(Slot::TargetUser),
            Guard::ResolveApplication(_) => Some(Slot::Application),
            Guard::RequireAuthenticated | Guard::RequireSelf | Guard::RequireApplicationOwner => {
                None
            }
        }
    }

    pub fn consumes(self) -> &'static [Slot] {
        match self {
            Guard::RequireAuthenticated => &[Slot::Caller],
            Guard::RequireSelf => &[Slot::TargetUser, Slot::Caller],
            Guard::RequireApplicationOwner => &[Slot::Caller, Slot::Application],
            Guard::OptionalAuthenticate
            | Guard::ResolveTargetUser(_)
            | Guard::ResolveApplication(_) => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum ChainError {
    #[error("{guard:?} reads the {slot} but no earlier guard produces it")]
    Unpopulated { guard: Guard, slot: Slot },
}

/// What a guard may look at besides the context.
#[derive(Debug, Clone, Copy)]
pub struct GuardInput<'a> {
    pub bearer: Option<&'a str>,
    pub params: &'a HashMap<String, String>,
}

/// An ordered guard list in which every consumed slot has an earlier producer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardChain {
    guards: Vec<Guard>,
}

impl GuardChain {
    pub fn new(guards: &[Guard]) -> Result<Self, ChainError> {
        let mut produced: Vec<Slot> = Vec::new();
        for &guard in guards {
            if let Some(&slot) = guard.consumes().iter().find(|s| !produced.contains(*s)) {
                return Err(ChainError::Unpopulated { guard, slot });
            }
            produced.extend(guard.produces());
        }
        Ok(Self {
            guards: guards.to_vec(),
        })
    }

    pub fn guards(&self) -> &[Guard] {
        &self.guards
    }

    /// Run every guard in order, stopping at the first rejection.
    pub async fn run(
        &self,
        store: &Store,
        sessions: &SessionResolver,
        input: &GuardInput<'_>,
    ) -> Result<RequestContext, KeeperError> {
        let mut ctx = RequestContext::default();
        for &guard in &self.guards {
            apply(guard, store, sessions, input, &mut ctx).await?;
        }
        Ok(ctx)
    }
}

fn unauthorized() -> KeeperError {
    KeeperError::Authentication("You must be authorized to access this endpoint".to_string())
}

fn invalid_session() -> KeeperError {
    KeeperError::Authorization("Invalid or expired session".to_string())
}

fn param<'a>(input: &GuardInput<'a>, name: &str) -> Result<&'a str, KeeperError> {
    input
        .params
        .get(name)
        .map(String::as_str)
        .ok_or_else(|| KeeperError::Integrity(format!("route has no `{name}` path parameter")))
}

async fn apply(
    guard: Guard,
    store: &Store,
    sessions: &SessionResolver,
    input: &GuardInput<'_>,
    ctx: &mut RequestContext,
) -> Result<(), KeeperError> {
    match guard {
        Guard::OptionalAuthenticate => {
            let Some(token) = input.bearer else {
                ctx.caller = None;
                return Ok(());
            };
            match sessions.resolve(token).await? {
                SessionLookup::Authenticated(identity) => ctx.caller = Some(identity),
                SessionLookup::NoToken => ctx.caller = None,
                SessionLookup::Invalid => return Err(invalid_session()),
            }
        }

        Guard::ResolveTargetUser(name) => {
            let user_id = param(input, name)?;
            if user_id == ME {
                if let Some(caller) = &ctx.caller {
                    ctx.target_user = Some(caller.clone());
                    return Ok(());
                }
                let token = input.bearer.ok_or_else(|| {
                    KeeperError::Authentication("Missing Authorization header".to_string())
                })?;
                match sessions.resolve(token).await? {
                    SessionLookup::Authenticated(identity) => ctx.target_user = Some(identity),
                    SessionLookup::NoToken => {
                        return Err(KeeperError::Authentication(
                            "Missing Authorization header".to_string(),
                        ));
                    }
                    SessionLookup::Invalid => return Err(invalid_session()),
                }
            } else {
                let identity = store
                    .get_identity(user_id)
                    .await?
                    .ok_or_else(|| KeeperError::not_found("No user found by that ID"))?;
                ctx.target_user = Some(identity);
            }
        }

        Guard::RequireAuthenticated => {
            if ctx.caller.is_none() {
                return Err(unauthorized());
            }
        }

        Guard::RequireSelf => {
            let target = ctx
                .target_user
                .as_ref()
                .ok_or_else(|| KeeperError::not_found("User not found"))?;
            let caller = ctx.caller.as_ref().ok_or_else(unauthorized)?;
            if caller.id != target.id {
                return Err(KeeperError::Authorization(
                    "You are not allowed to access this user".to_string(),
                ));
            }
        }

        Guard::ResolveApplication(name) => {
            let application_id = param(input, name)?;
            let application = store
                .get_application(application_id)
                .await?
                .ok_or_else(|| KeeperError::not_found("No application found by that ID"))?;
            ctx.application = Some(application);
        }

        Guard::RequireApplicationOwner => {
            let caller = ctx.caller.as_ref().ok_or_else(unauthorized)?;
            let application = ctx
                .application
                .as_ref()
                .ok_or_else(|| KeeperError::not_found("No application found by that ID"))?;
            if caller.id != application.user_id {
                return Err(KeeperError::Authorization(
                    "You are not the owner of this application".to_string(),
                ));
            }
        }
    }
    Ok(())
}
