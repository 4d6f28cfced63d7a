//! Throwaway `PostgreSQL` databases for integration tests.
//!
//! Each [`TestDatabase`] is a freshly created, fully migrated database with
//! a random name, so suites can run in parallel. Connection settings come
//! from `TEST_DB_*` variables.

use std::sync::Arc;

use reelvote_common::{AppError, AppResult};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbErr, Statement, Value};
use tracing::{info, warn};

/// Tables in child-to-parent order.
const TABLES: [&str; 4] = ["ballot_change_log", "ballot", "event_entry", "voting_event"];

fn db_err(e: DbErr) -> AppError {
    AppError::Database(e.to_string())
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Server and credentials used for test databases.
#[derive(Debug, Clone)]
pub struct TestDbConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Prefix of every generated database name.
    pub name_prefix: String,
}

impl Default for TestDbConfig {
    fn default() -> Self {
        Self {
            host: env_or("TEST_DB_HOST", "localhost"),
            port: std::env::var("TEST_DB_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5433),
            username: env_or("TEST_DB_USER", "reelvote_test"),
            password: env_or("TEST_DB_PASSWORD", "reelvote_test"),
            name_prefix: env_or("TEST_DB_NAME", "reelvote_test"),
        }
    }
}

impl TestDbConfig {
    /// URL of `database` on the test server.
    #[must_use]
    pub fn url_for(&self, database: &str) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{database}",
            self.username, self.password, self.host, self.port
        )
    }

    /// URL of the maintenance database used to create and drop test databases.
    #[must_use]
    pub fn maintenance_url(&self) -> String {
        self.url_for("postgres")
    }

    fn unique_name(&self) -> String {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        format!("{}_{}", self.name_prefix, &suffix[..8])
    }
}

/// A migrated database that lives until [`TestDatabase::drop_database`].
pub struct TestDatabase {
    conn: Arc<DatabaseConnection>,
    name: String,
    config: TestDbConfig,
}

impl TestDatabase {
    /// Create and migrate a database using `TEST_DB_*` settings.
    pub async fn create_unique() -> AppResult<Self> {
        Self::create_with(TestDbConfig::default()).await
    }

    /// Create and migrate a database on the given server.
    pub async fn create_with(config: TestDbConfig) -> AppResult<Self> {
        let name = config.unique_name();

        let admin = Database::connect(&config.maintenance_url())
            .await
            .map_err(db_err)?;
        admin
            .execute_unprepared(&format!("CREATE DATABASE \"{name}\""))
            .await
            .map_err(db_err)?;
        admin.close().await.map_err(db_err)?;

        let conn = Database::connect(&config.url_for(&name))
            .await
            .map_err(db_err)?;
        crate::migrate(&conn).await?;

        info!(database = %name, "Test database ready");
        Ok(Self {
            conn: Arc::new(conn),
            name,
            config,
        })
    }

    /// Name of the generated database.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Borrow the connection, e.g. for raw `ActiveModel` inserts.
    #[must_use]
    pub fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }

    /// Shared handle for building repositories.
    #[must_use]
    pub fn shared(&self) -> Arc<DatabaseConnection> {
        Arc::clone(&self.conn)
    }

    /// Empty every voting table, keeping the schema.
    pub async fn reset(&self) -> AppResult<()> {
        let tables = TABLES.map(|t| format!("\"{t}\"")).join(", ");
        let truncate = format!("TRUNCATE TABLE {tables} CASCADE");
        self.conn
            .execute_unprepared(&truncate)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    /// Drop the database. Repositories built from [`Self::shared`] should be
    /// dropped first so the pool can close cleanly; any sessions still open
    /// are terminated.
    pub async fn drop_database(self) -> AppResult<()> {
        match Arc::try_unwrap(self.conn) {
            Ok(conn) => conn.close().await.map_err(db_err)?,
            Err(_) => warn!(database = %self.name, "Connection still shared at drop"),
        }

        let admin = Database::connect(&self.config.maintenance_url())
            .await
            .map_err(db_err)?;

        let terminate = Statement::from_sql_and_values(
            admin.get_database_backend(),
            "SELECT pg_terminate_backend(pid) FROM pg_stat_activity WHERE datname = $1",
            [Value::from(self.name.clone())],
        );
        if let Err(e) = admin.execute(terminate).await {
            warn!(database = %self.name, error = %e, "Failed to terminate sessions");
        }

        admin
            .execute_unprepared(&format!("DROP DATABASE IF EXISTS \"{}\"", self.name))
            .await
            .map_err(db_err)?;
        admin.close().await.map_err(db_err)?;

        info!(database = %self.name, "Test database dropped");
        Ok(())
    }
}
