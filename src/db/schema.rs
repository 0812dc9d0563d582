//! SQL DDL for initializing the application store.
//! Timestamps are RFC3339 text, except `usage_records.timestamp_ms`
//! which is epoch milliseconds so range scans compare numerically.

/// SQLite schema. `identities.email` is UNIQUE so concurrent signups with
/// the same address cannot both land.
pub const SQLITE_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS identities (
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL,
    password_hash TEXT NULL,
    kind TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_identities_email ON identities(email);

CREATE TABLE IF NOT EXISTS sessions (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS applications (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    name TEXT NOT NULL,
    short_description TEXT NOT NULL,
    token TEXT NOT NULL,
    total_requests INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_applications_user_id ON applications(user_id);

CREATE TABLE IF NOT EXISTS tokens (
    id TEXT PRIMARY KEY,
    application_id TEXT NOT NULL,
    name TEXT NOT NULL,
    token TEXT NOT NULL,
    total_requests INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    last_used_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_tokens_application_id ON tokens(application_id);

CREATE TABLE IF NOT EXISTS usage_records (
    application_id TEXT NOT NULL,
    timestamp_ms INTEGER NOT NULL,
    request_count INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_usage_records_app_ts ON usage_records(application_id, timestamp_ms);
"#;
