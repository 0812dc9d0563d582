pub mod applications;
pub mod auth;
pub mod oauth;
pub mod tokens;
pub mod usage;
pub mod users;
