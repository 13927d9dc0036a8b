//! # Database Infrastructure
//!
//! This crate provides a single way to open, check, and migrate a
//! [SurrealDB](https://surrealdb.com) connection for the whole workspace.
//!
//! ## Key Features
//! - **Engine Agnostic**: Supports `mem://`, `rocksdb://`, `ws://`, and `http://` via the `any` engine.
//! - **Resilient Connectivity**: Built-in retry logic for health checks during engine startup.
//! - **Migrations**: Feature slices hand their versioned scripts to the builder; every
//!   script runs once, inside a transaction, and is checksum-verified on later starts.
//!
//! ## Example
//!
//! ```rust
//! use evreg_database::{Database, DatabaseError, Migration};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), DatabaseError> {
//!     let db = Database::builder()
//!         .url("mem://")
//!         .session("evreg", "events")
//!         .migration(Migration::new("demo", "0001-demo", "DEFINE TABLE OVERWRITE demo SCHEMALESS;"))
//!         .init()
//!         .await?;
//!
//!     let _version = db.version().await?;
//!     Ok(())
//! }
//! ```

mod error;
mod migrations;

pub use error::{DatabaseError, DatabaseErrorExt};
pub use migrations::{AppliedMigration, Migration, MigrationReport};

use migrations::MigrationRunner;
use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;
use surrealdb::Surreal;
use surrealdb::engine::any::{Any, connect};
use surrealdb::opt::auth::Root;
use tracing::{info, instrument, trace, warn};

/// Number of health probes made before giving up on the engine.
const HEALTH_ATTEMPTS: u32 = 3;
/// Delay before the second probe; doubled after each failure.
const HEALTH_INITIAL_DELAY: Duration = Duration::from_millis(500);

/// Inner state of the [`Database`] wrapper.
#[derive(Debug)]
pub struct DatabaseInner {
    instance: Surreal<Any>,
    ns: String,
    db: String,
}

impl Drop for DatabaseInner {
    fn drop(&mut self) {
        info!(ns = %self.ns, db = %self.db, "SurrealDB session handle dropped");
    }
}

/// `SurrealDB` client wrapper that provides cheap cloning and contextual error handling.
#[derive(Debug, Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
}

impl Database {
    /// Creates a new [`DatabaseBuilder`].
    pub fn builder() -> DatabaseBuilder {
        DatabaseBuilder::new()
    }

    /// Namespace this handle is bound to.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.inner.ns
    }

    /// Database name this handle is bound to.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.db
    }
}

impl Deref for Database {
    type Target = Surreal<Any>;

    fn deref(&self) -> &Self::Target {
        &self.inner.instance
    }
}

/// A fluent builder for configuring and establishing a `SurrealDB` connection.
#[must_use = "builders do nothing unless you call .init()"]
#[derive(Debug, Default)]
pub struct DatabaseBuilder {
    url: Option<String>,
    ns: Option<String>,
    db: Option<String>,
    auth: Option<(String, String)>,
    migrations: Vec<Migration>,
}

impl DatabaseBuilder {
    /// Creates a new [`DatabaseBuilder`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the connection URL.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Sets the namespace and database name.
    pub fn session(mut self, namespace: impl Into<String>, database: impl Into<String>) -> Self {
        self.ns = Some(namespace.into());
        self.db = Some(database.into());
        self
    }

    /// Add root credentials to the connection.
    pub fn auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth = Some((username.into(), password.into()));
        self
    }

    /// Registers one slice migration.
    pub fn migration(mut self, migration: Migration) -> Self {
        self.migrations.push(migration);
        self
    }

    /// Registers slice migrations in execution order.
    pub fn migrations<I>(mut self, migrations: I) -> Self
    where
        I: IntoIterator<Item = Migration>,
    {
        self.migrations.extend(migrations);
        self
    }

    /// Consumes the builder and establishes a migrated connection.
    ///
    /// # Process
    /// 1. **Validation**: Ensures URL, Namespace, and Database name are provided.
    /// 2. **Engine Initialization**: Connects to the underlying `SurrealDB` engine (Any).
    /// 3. **Resilience**: Probes health up to 3 times with exponential backoff (starting at 500ms).
    /// 4. **Authentication**: Signs in as a Root user if credentials were provided.
    /// 5. **Session Activation**: Selects the namespace and database.
    /// 6. **Migrations**: Applies the ledger bootstrap and every pending slice migration.
    ///
    /// # Errors
    /// * [`DatabaseError::Validation`] if required parameters are missing.
    /// * [`DatabaseError::Connection`] if the engine fails to start or remains unhealthy.
    /// * [`DatabaseError::Auth`] if the provided credentials are rejected.
    /// * [`DatabaseError::Surreal`] if session activation or a migration statement fails.
    /// * [`DatabaseError::Migration`] if an applied migration changed since it ran.
    #[instrument(skip(self), fields(url = ?self.url, ns = ?self.ns, db = ?self.db))]
    pub async fn init(self) -> Result<Database, DatabaseError> {
        let url = self.url.ok_or(DatabaseError::Validation {
            message: "URL is required".into(),
            context: None,
        })?;
        let ns = self.ns.ok_or(DatabaseError::Validation {
            message: "Namespace is required".into(),
            context: None,
        })?;
        let db = self.db.ok_or(DatabaseError::Validation {
            message: "Database is required".into(),
            context: None,
        })?;

        let instance = connect(&url).await.map_err(|e| DatabaseError::Connection {
            message: e.to_string().into(),
            context: Some("Initializing engine".into()),
        })?;

        wait_until_healthy(&instance, &url).await?;

        if let Some((username, password)) = self.auth {
            instance.signin(Root { username, password }).await.map_err(|e| {
                DatabaseError::Auth { message: e.to_string().into(), context: Some(url.clone().into()) }
            })?;
        }

        instance.use_ns(&ns).use_db(&db).await.context("Activating session")?;

        let version =
            instance.version().await.map_or_else(|_| "unknown".to_owned(), |v| v.to_string());
        info!(namespace = %ns, database = %db, %version, "SurrealDB connection established");

        let report = MigrationRunner::new(&instance).run(&self.migrations).await?;
        for skipped in &report.skipped {
            trace!(slice = %skipped.slice, version = %skipped.version, "Skipping migration");
        }
        for applied in &report.applied {
            info!(slice = %applied.slice, version = %applied.version, "Applied migration");
        }

        Ok(Database { inner: Arc::new(DatabaseInner { instance, ns, db }) })
    }
}

async fn wait_until_healthy(instance: &Surreal<Any>, url: &str) -> Result<(), DatabaseError> {
    let mut delay = HEALTH_INITIAL_DELAY;
    for attempt in 1..=HEALTH_ATTEMPTS {
        if instance.health().await.is_ok() {
            return Ok(());
        }
        if attempt == HEALTH_ATTEMPTS {
            break;
        }
        warn!(attempt, ?delay, "Database not ready, retrying...");
        tokio::time::sleep(delay).await;
        delay *= 2;
    }

    Err(DatabaseError::Connection {
        message: "Unhealthy after retries".into(),
        context: Some(url.to_owned().into()),
    })
}
