//! # Database Handle
//!
//! Opens the backend named by the store URI and hands out repositories.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Database Connection Handle                         │
//! │                                                                         │
//! │  Service Startup                                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  StoreConfig::load() ← CROPCOG_STORE_URI and friends                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::connect(&config).await                                      │
//! │       │                                                                 │
//! │       ├── sqlite:...   ──► SqlitePool + embedded migrations            │
//! │       │                                                                 │
//! │       └── mongodb://.. ──► mongodb::Client (pooled) + ping             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  db.products()  ──► Arc<dyn ProductRepository>                         │
//! │                     (holds a clone of the pool / collection handle)    │
//! │                                                                         │
//! │  Repositories are cheap to create. The pool is shared, never copied.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## WAL Mode
//! File-backed SQLite databases run in WAL mode so readers don't block the
//! writer.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use mongodb::bson::doc;
use mongodb::options::ClientOptions;
use mongodb::{Client, Database as MongoDatabase};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use cropcog_core::{Document, Product};

use crate::config::{Backend, StoreConfig};
use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::mongo::MongoRepository;
use crate::repository::product::ProductRepository;
use crate::repository::sqlite::SqliteRepository;
use crate::repository::CrudRepository;

/// Name MongoDB shows for our connections in server logs.
const APP_NAME: &str = "cropcog";

#[derive(Debug, Clone)]
enum Store {
    Sqlite(SqlitePool),
    Mongo {
        client: Client,
        database: MongoDatabase,
    },
}

/// Main database handle providing repository access.
///
/// ## Usage
/// ```rust,ignore
/// let config = StoreConfig::load()?;
/// let db = Database::connect(&config).await?;
///
/// let products = db.products();
/// let saved = products.save(Product::new("Seed A")).await?;
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    store: Store,
    product_collection: String,
}

impl Database {
    /// Connects to the store named by `config.uri`.
    ///
    /// ## What This Does
    /// 1. Validates the configuration and picks the backend from the scheme
    /// 2. SQLite: opens the pool (creating the file if needed) and runs migrations
    /// 3. MongoDB: builds a pooled client and pings the deployment
    ///
    /// ## Returns
    /// * `Ok(Database)` - Ready-to-use handle
    /// * `Err(DbError::InvalidArgument)` - Bad configuration
    /// * `Err(DbError::Connection)` - Store unreachable
    pub async fn connect(config: &StoreConfig) -> DbResult<Self> {
        config
            .validate()
            .map_err(|e| DbError::InvalidArgument(e.to_string()))?;
        let backend = config
            .backend()
            .map_err(|e| DbError::InvalidArgument(e.to_string()))?;

        info!(
            uri = %config.redacted_uri(),
            ?backend,
            "Initializing document store connection"
        );

        let store = match backend {
            Backend::Sqlite => Store::Sqlite(connect_sqlite(config).await?),
            Backend::Mongo => connect_mongo(config).await?,
        };

        let product_collection = config
            .product_collection
            .clone()
            .unwrap_or_else(Product::collection_name);

        Ok(Database {
            store,
            product_collection,
        })
    }

    /// Which backend this handle talks to.
    pub fn backend(&self) -> Backend {
        match self.store {
            Store::Sqlite(_) => Backend::Sqlite,
            Store::Mongo { .. } => Backend::Mongo,
        }
    }

    /// Collection the product repository reads and writes.
    pub fn product_collection(&self) -> &str {
        &self.product_collection
    }

    /// Returns the product repository.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let product = db.products().find_by_id("abc123").await?;
    /// ```
    pub fn products(&self) -> Arc<dyn ProductRepository> {
        match &self.store {
            Store::Sqlite(pool) => Arc::new(SqliteRepository::<Product>::with_collection(
                pool.clone(),
                self.product_collection.clone(),
            )),
            Store::Mongo { database, .. } => Arc::new(
                MongoRepository::<Product>::with_collection(database, &self.product_collection),
            ),
        }
    }

    /// Returns a repository for any document type, in its conventional
    /// collection.
    pub fn repository<T: Document>(&self) -> Arc<dyn CrudRepository<T>> {
        match &self.store {
            Store::Sqlite(pool) => Arc::new(SqliteRepository::<T>::new(pool.clone())),
            Store::Mongo { database, .. } => Arc::new(MongoRepository::<T>::new(database)),
        }
    }

    /// Returns the SQLite pool, when this handle is SQLite-backed.
    pub fn sqlite_pool(&self) -> Option<&SqlitePool> {
        match &self.store {
            Store::Sqlite(pool) => Some(pool),
            Store::Mongo { .. } => None,
        }
    }

    /// Checks if the store is responsive.
    ///
    /// ## Returns
    /// * `true` - Store answered `SELECT 1` / `ping`
    /// * `false` - Store is unavailable
    pub async fn health_check(&self) -> bool {
        let result = match &self.store {
            Store::Sqlite(pool) => sqlx::query("SELECT 1")
                .execute(pool)
                .await
                .map(|_| ())
                .map_err(DbError::from),
            Store::Mongo { database, .. } => ping(database).await,
        };

        if let Err(e) = &result {
            warn!(error = %e, "Health check failed");
        }
        result.is_ok()
    }

    /// Closes the connection pool.
    ///
    /// ## Note
    /// After calling close, every repository obtained from this handle fails
    /// with `DbError::Connection`.
    pub async fn close(&self) {
        info!(backend = ?self.backend(), "Closing document store connection");
        match &self.store {
            Store::Sqlite(pool) => pool.close().await,
            Store::Mongo { client, .. } => client.clone().shutdown().await,
        }
    }
}

async fn connect_sqlite(config: &StoreConfig) -> DbResult<SqlitePool> {
    let in_memory = config.uri.contains(":memory:");

    let connect_options = SqliteConnectOptions::from_str(&config.uri)
        .map_err(|e| DbError::Connection(e.to_string()))?
        // Readers don't block the writer
        .journal_mode(SqliteJournalMode::Wal)
        .create_if_missing(true);

    debug!(in_memory, "Connection options configured");

    let mut pool_options = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(1)
        .acquire_timeout(config.connect_timeout);

    // sqlx opens `:memory:` as a named shared-cache database that lives only
    // while a connection is open; keep connections alive so it isn't dropped.
    if in_memory {
        pool_options = pool_options
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>);
    }

    let pool = pool_options
        .connect_with(connect_options)
        .await
        .map_err(|e| DbError::Connection(e.to_string()))?;

    info!(
        max_connections = config.max_connections,
        "SQLite pool created"
    );

    if config.run_migrations {
        migrations::run_migrations(&pool).await?;
    }

    Ok(pool)
}

async fn connect_mongo(config: &StoreConfig) -> DbResult<Store> {
    let mut options = ClientOptions::parse(&config.uri).await?;
    options.app_name = Some(APP_NAME.to_string());
    options.max_pool_size = Some(config.max_connections);
    options.connect_timeout = Some(config.connect_timeout);
    options.server_selection_timeout = Some(config.connect_timeout);

    let client = Client::with_options(options)?;
    let database = client.database(&config.database);

    ping(&database).await?;

    info!(
        database = %config.database,
        max_connections = config.max_connections,
        "MongoDB client connected"
    );

    Ok(Store::Mongo { client, database })
}

async fn ping(database: &MongoDatabase) -> DbResult<()> {
    database.run_command(doc! { "ping": 1 }).await?;
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
