use crate::db::models::{Application, Identity, Session, Token, UsageRecord};
use crate::db::schema::SQLITE_INIT;
use crate::error::KeeperError;
use crate::types::sort::{ApplicationSort, SortDirection, TokenSort};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, Row, Sqlite};
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

pub type SqlitePool = Pool<Sqlite>;

/// Document-style storage for identities, sessions, applications, tokens and usage.
///
/// Every call is a single statement bounded by the same deadline; there are no
/// multi-statement transactions and no retries.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
    deadline: Duration,
}

impl Store {
    fn new(pool: SqlitePool, deadline: Duration) -> Self {
        Self { pool, deadline }
    }

    /// Open (creating if missing) the database at `database_url` and apply the schema.
    pub async fn connect(database_url: &str, deadline: Duration) -> Result<Self, KeeperError> {
        let connect_opts = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let mut pool_opts = SqlitePoolOptions::new().max_connections(8);
        if database_url.contains(":memory:") {
            // An in-memory database lives and dies with its single connection.
            pool_opts = pool_opts
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }
        let pool = pool_opts.connect_with(connect_opts).await?;
        let store = Self::new(pool, deadline);
        store.init_schema().await?;
        Ok(store)
    }

    /// Initialize the schema by executing the bundled DDL.
    async fn init_schema(&self) -> Result<(), KeeperError> {
        // sqlx::query runs one statement at a time
        for stmt in SQLITE_INIT.split(';') {
            let s = stmt.trim();
            if s.is_empty() {
                continue;
            }
            self.bounded(sqlx::query(s).execute(&self.pool)).await?;
        }
        Ok(())
    }

    async fn bounded<T, F>(&self, fut: F) -> Result<T, KeeperError>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        match tokio::time::timeout(self.deadline, fut).await {
            Ok(res) => res.map_err(KeeperError::from),
            Err(_) => Err(KeeperError::StoreTimeout(self.deadline)),
        }
    }

    async fn bounded_insert<F>(&self, fut: F, what: &str) -> Result<(), KeeperError>
    where
        F: Future<Output = Result<sqlx::sqlite::SqliteQueryResult, sqlx::Error>>,
    {
        match tokio::time::timeout(self.deadline, fut).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(KeeperError::from_insert(e, what)),
            Err(_) => Err(KeeperError::StoreTimeout(self.deadline)),
        }
    }

    // identities

    pub async fn insert_identity(&self, identity: &Identity) -> Result<(), KeeperError> {
        let query = sqlx::query(
            "INSERT INTO identities (id, email, password_hash, kind, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&identity.id)
        .bind(&identity.email)
        .bind(&identity.password_hash)
        .bind(identity.kind)
        .bind(identity.created_at)
        .execute(&self.pool);
        self.bounded_insert(query, "user").await
    }

    pub async fn get_identity(&self, id: &str) -> Result<Option<Identity>, KeeperError> {
        let query = sqlx::query_as::<_, Identity>(
            "SELECT id, email, password_hash, kind, created_at FROM identities WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool);
        self.bounded(query).await
    }

    pub async fn get_identity_by_email(&self, email: &str) -> Result<Option<Identity>, KeeperError> {
        let query = sqlx::query_as::<_, Identity>(
            "SELECT id, email, password_hash, kind, created_at FROM identities WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool);
        self.bounded(query).await
    }

    // sessions

    pub async fn insert_session(&self, session: &Session) -> Result<(), KeeperError> {
        let query = sqlx::query("INSERT INTO sessions (id, user_id, created_at) VALUES (?, ?, ?)")
            .bind(&session.id)
            .bind(&session.user_id)
            .bind(session.created_at)
            .execute(&self.pool);
        self.bounded_insert(query, "session").await
    }

    pub async fn get_session(&self, id: &str) -> Result<Option<Session>, KeeperError> {
        let query = sqlx::query_as::<_, Session>(
            "SELECT id, user_id, created_at FROM sessions WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool);
        self.bounded(query).await
    }

    // applications

    pub async fn insert_application(&self, app: &Application) -> Result<(), KeeperError> {
        let query = sqlx::query(
            r#"INSERT INTO applications (
                id, user_id, name, short_description, token, total_requests, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&app.id)
        .bind(&app.user_id)
        .bind(&app.name)
        .bind(&app.short_description)
        .bind(&app.token)
        .bind(app.total_requests)
        .bind(app.created_at)
        .execute(&self.pool);
        self.bounded_insert(query, "application").await
    }

    pub async fn get_application(&self, id: &str) -> Result<Option<Application>, KeeperError> {
        let query = sqlx::query_as::<_, Application>(
            r#"SELECT id, user_id, name, short_description, token, total_requests, created_at
               FROM applications WHERE id = ?"#,
        )
        .bind(id)
        .fetch_optional(&self.pool);
        self.bounded(query).await
    }

    pub async fn list_applications_by_user(
        &self,
        user_id: &str,
        sort: ApplicationSort,
        direction: SortDirection,
    ) -> Result<Vec<Application>, KeeperError> {
        // Column and direction come from closed enums, never from raw input.
        let sql = format!(
            r#"SELECT id, user_id, name, short_description, token, total_requests, created_at
               FROM applications WHERE user_id = ? ORDER BY {} {}, id"#,
            sort.column(),
            direction.as_sql()
        );
        let query = sqlx::query_as::<_, Application>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool);
        self.bounded(query).await
    }

    pub async fn update_application_details(
        &self,
        id: &str,
        name: &str,
        short_description: &str,
    ) -> Result<(), KeeperError> {
        let query =
            sqlx::query("UPDATE applications SET name = ?, short_description = ? WHERE id = ?")
                .bind(name)
                .bind(short_description)
                .bind(id)
                .execute(&self.pool);
        self.bounded(query).await?;
        Ok(())
    }

    pub async fn delete_application(&self, id: &str) -> Result<(), KeeperError> {
        let query = sqlx::query("DELETE FROM applications WHERE id = ?")
            .bind(id)
            .execute(&self.pool);
        self.bounded(query).await?;
        Ok(())
    }

    // tokens

    pub async fn insert_token(&self, token: &Token) -> Result<(), KeeperError> {
        let query = sqlx::query(
            r#"INSERT INTO tokens (
                id, application_id, name, token, total_requests, created_at, last_used_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&token.id)
        .bind(&token.application_id)
        .bind(&token.name)
        .bind(&token.token)
        .bind(token.total_requests)
        .bind(token.created_at)
        .bind(token.last_used_at)
        .execute(&self.pool);
        self.bounded_insert(query, "token").await
    }

    pub async fn get_token(&self, id: &str) -> Result<Option<Token>, KeeperError> {
        let query = sqlx::query_as::<_, Token>(
            r#"SELECT id, application_id, name, token, total_requests, created_at, last_used_at
               FROM tokens WHERE id = ?"#,
        )
        .bind(id)
        .fetch_optional(&self.pool);
        self.bounded(query).await
    }

    pub async fn list_tokens_by_application(
        &self,
        application_id: &str,
        sort: TokenSort,
        direction: SortDirection,
    ) -> Result<Vec<Token>, KeeperError> {
        let sql = format!(
            r#"SELECT id, application_id, name, token, total_requests, created_at, last_used_at
               FROM tokens WHERE application_id = ? ORDER BY {} {}, id"#,
            sort.column(),
            direction.as_sql()
        );
        let query = sqlx::query_as::<_, Token>(&sql)
            .bind(application_id)
            .fetch_all(&self.pool);
        self.bounded(query).await
    }

    pub async fn delete_token(&self, id: &str) -> Result<(), KeeperError> {
        let query = sqlx::query("DELETE FROM tokens WHERE id = ?")
            .bind(id)
            .execute(&self.pool);
        self.bounded(query).await?;
        Ok(())
    }

    // usage

    pub async fn insert_usage_record(&self, record: &UsageRecord) -> Result<(), KeeperError> {
        let query = sqlx::query(
            "INSERT INTO usage_records (application_id, timestamp_ms, request_count) VALUES (?, ?, ?)",
        )
        .bind(&record.application_id)
        .bind(record.timestamp.timestamp_millis())
        .bind(record.request_count)
        .execute(&self.pool);
        self.bounded_insert(query, "usage record").await
    }

    /// Usage records of one application with `from <= timestamp <= to`, oldest first.
    pub async fn list_usage_records(
        &self,
        application_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<UsageRecord>, KeeperError> {
        let query = sqlx::query(
            r#"SELECT application_id, timestamp_ms, request_count FROM usage_records
               WHERE application_id = ? AND timestamp_ms >= ? AND timestamp_ms <= ?
               ORDER BY timestamp_ms"#,
        )
        .bind(application_id)
        .bind(from.timestamp_millis())
        .bind(to.timestamp_millis())
        .fetch_all(&self.pool);
        let rows = self.bounded(query).await?;
        rows.into_iter().map(Self::row_to_usage).collect()
    }

    fn row_to_usage(row: SqliteRow) -> Result<UsageRecord, KeeperError> {
        let application_id: String = row.try_get("application_id")?;
        let timestamp_ms: i64 = row.try_get("timestamp_ms")?;
        let request_count: i64 = row.try_get("request_count")?;

        let timestamp = DateTime::<Utc>::from_timestamp_millis(timestamp_ms).ok_or_else(|| {
            KeeperError::Integrity(format!("usage timestamp {timestamp_ms} out of range"))
        })?;

        Ok(UsageRecord {
            application_id,
            timestamp,
            request_count,
        })
    }
}
