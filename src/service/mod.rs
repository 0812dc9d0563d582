pub mod accounts;
pub mod secrets;
pub mod sessions;
pub mod usage;

pub use accounts::AccountService;
pub use sessions::{SessionLookup, SessionResolver};
