//! OAuth login collaborators for Discord and GitHub.

pub mod endpoints;
pub mod service;

pub use endpoints::GitHubEmail;
pub use service::{IdentityProvider, Providers, select_primary_email};
