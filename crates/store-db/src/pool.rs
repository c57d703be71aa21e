//! # SQLite Pool
//!
//! Opening the store database and handing out repositories.
//!
//! ```text
//! DbConfig ──► connect_options() ──► SqlitePool ──► migrations ──► Database
//!                 WAL                                                 │
//!                 synchronous = NORMAL                                 │ clone
//!                 foreign_keys = ON                                    ▼
//!                 busy_timeout                                   AppState.db
//!                                                                     │
//!                                   db.vendors() / db.orders() / … ◄──┘
//! ```
//!
//! Repositories are cheap: each holds a clone of the pool handle.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use tracing::info;

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::{
    AgencyRepository, BranchRepository, EmployeeRepository, InventoryRepository,
    OrderRepository, PeopleRepository, ProductRepository, RawMaterialRepository,
    VehicleRepository, VendorRepository, WarehouseRepository,
};

const MEMORY: &str = ":memory:";

// =============================================================================
// Configuration
// =============================================================================

/// Where the store database lives and how the pool behaves.
///
/// ```rust,ignore
/// let config = DbConfig::new("./sweet_store.db").max_connections(8);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Database file; `:memory:` for a private in-memory database.
    pub database_path: PathBuf,
    pub max_connections: u32,
    pub min_connections: u32,
    /// How long a request waits for a free connection.
    pub acquire_timeout: Duration,
    /// How long SQLite waits on a locked database before `SQLITE_BUSY`.
    pub busy_timeout: Duration,
    pub idle_timeout: Duration,
    pub run_migrations: bool,
}

impl DbConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(30),
            busy_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(600),
            run_migrations: true,
        }
    }

    /// A fresh in-memory database.
    ///
    /// Every in-memory connection is a separate database, so the pool holds
    /// exactly one and never retires it.
    pub fn in_memory() -> Self {
        DbConfig {
            max_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            ..DbConfig::new(MEMORY)
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max.max(1);
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    fn is_memory(&self) -> bool {
        self.database_path.as_os_str() == MEMORY
    }

    fn connect_options(&self) -> DbResult<SqliteConnectOptions> {
        let options = if self.is_memory() {
            SqliteConnectOptions::from_str("sqlite::memory:")
        } else {
            SqliteConnectOptions::from_str(&format!(
                "sqlite://{}",
                self.database_path.display()
            ))
            .map(|options| options.create_if_missing(true))
        }
        .map_err(|e| DbError::Connection(e.to_string()))?;

        Ok(options
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(self.busy_timeout))
    }
}

// =============================================================================
// Database
// =============================================================================

/// The shared database handle. Built in `main` and passed down through
/// application state.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens the pool and, unless disabled, brings the schema up to date.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        let options = config.connect_options()?;

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections.min(config.max_connections))
            .acquire_timeout(config.acquire_timeout);
        pool_options = if config.is_memory() {
            pool_options.idle_timeout(None).max_lifetime(None)
        } else {
            pool_options.idle_timeout(Some(config.idle_timeout))
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| DbError::Connection(e.to_string()))?;
        info!(
            path = %config.database_path.display(),
            max_connections = config.max_connections,
            "Database opened"
        );

        let db = Database { pool };
        if config.run_migrations {
            migrations::run_migrations(&db.pool).await?;
        }
        Ok(db)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn people(&self) -> PeopleRepository {
        PeopleRepository::new(self.pool.clone())
    }

    pub fn employees(&self) -> EmployeeRepository {
        EmployeeRepository::new(self.pool.clone())
    }

    pub fn branches(&self) -> BranchRepository {
        BranchRepository::new(self.pool.clone())
    }

    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.pool.clone())
    }

    pub fn orders(&self) -> OrderRepository {
        OrderRepository::new(self.pool.clone())
    }

    pub fn inventory(&self) -> InventoryRepository {
        InventoryRepository::new(self.pool.clone())
    }

    pub fn raw_materials(&self) -> RawMaterialRepository {
        RawMaterialRepository::new(self.pool.clone())
    }

    pub fn vendors(&self) -> VendorRepository {
        VendorRepository::new(self.pool.clone())
    }

    pub fn warehouses(&self) -> WarehouseRepository {
        WarehouseRepository::new(self.pool.clone())
    }

    pub fn agencies(&self) -> AgencyRepository {
        AgencyRepository::new(self.pool.clone())
    }

    pub fn vehicles(&self) -> VehicleRepository {
        VehicleRepository::new(self.pool.clone())
    }

    /// Waits for checked-out connections to return, then closes the pool.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Database closed");
    }

    /// Embedded and applied migration counts.
    pub async fn migration_status(&self) -> DbResult<(usize, usize)> {
        migrations::migration_status(&self.pool).await
    }

    /// `GET /health` probe.
    pub async fn health_check(&self) -> bool {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_database() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(db.health_check().await);
    }

    #[tokio::test]
    async fn test_foreign_keys_enforced() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let on: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(on, 1);

        let orphan = sqlx::query(
            "INSERT INTO customer (customer_id, registration_date, password) VALUES (404, '2026-01-01', 'x')",
        )
        .execute(db.pool())
        .await;
        assert!(orphan.is_err());
    }

    #[tokio::test]
    async fn test_closed_pool_is_unhealthy() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.close().await;
        assert!(!db.health_check().await);
    }

    #[tokio::test]
    async fn test_skip_migrations() {
        let db = Database::new(DbConfig::in_memory().run_migrations(false))
            .await
            .unwrap();
        let tables: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'vendor'",
        )
        .fetch_one(db.pool())
        .await
        .unwrap();
        assert_eq!(tables, 0);
    }

    #[test]
    fn test_config_builder() {
        let config = DbConfig::new("/tmp/sweet.db")
            .max_connections(0)
            .busy_timeout(Duration::from_secs(1));
        assert_eq!(config.max_connections, 1);
        assert_eq!(config.busy_timeout, Duration::from_secs(1));
        assert!(!config.is_memory());
        assert!(DbConfig::in_memory().is_memory());
    }
}
