//! # cropcog-db: Document Store Layer for the Product Store
//!
//! This crate provides identity-keyed CRUD over document collections.
//! MongoDB is the networked backend; SQLite (via sqlx) stores the same
//! documents as JSON rows for development and tests.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Product Store Data Flow                          │
//! │                                                                         │
//! │  Service layer (products().save(...))                                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    cropcog-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │    Codec     │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (codec.rs)  │  │   │
//! │  │   │               │    │ CrudRepository│    │              │  │   │
//! │  │   │ SqlitePool or │◄───│ SqliteRepo    │───►│ entity ⇄     │  │   │
//! │  │   │ mongodb::     │    │ MongoRepo     │    │ JSON / BSON  │  │   │
//! │  │   │ Client        │    │               │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  MongoDB deployment   or   SQLite file / in-memory database     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - Store configuration loaded from the environment
//! - [`pool`] - Backend selection and connection handle
//! - [`repository`] - The `CrudRepository` interface and its adapters
//! - [`codec`] - Entity to document conversion
//! - [`migrations`] - Embedded SQLite migrations
//! - [`error`] - Database error types
//! - [`logging`] - Tracing subscriber setup
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cropcog_core::Product;
//! use cropcog_db::{Database, StoreConfig};
//!
//! let db = Database::connect(&StoreConfig::load()?).await?;
//! let products = db.products();
//!
//! let saved = products.save(Product::new("Seed A")).await?;
//! let key = saved.id.clone().unwrap();
//! assert_eq!(products.find_by_id(&key).await?, Some(saved));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod codec;
pub mod config;
pub mod error;
pub mod logging;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{Backend, ConfigError, StoreConfig};
pub use error::{DbError, DbResult};
pub use pool::Database;

// Repository re-exports for convenience
pub use repository::mongo::MongoRepository;
pub use repository::product::{
    generate_product_id, MongoProductRepository, ProductRepository, SqliteProductRepository,
};
pub use repository::sqlite::SqliteRepository;
pub use repository::{CrudRepository, Direction, DocumentStream, Page, PageRequest, Sort};
