pub mod auth;
pub mod body;
pub mod context;
pub mod guards;

pub use context::{Caller, RequestContext, TargetApplication, TargetUser};
pub use guards::{ChainError, Guard, GuardChain};
