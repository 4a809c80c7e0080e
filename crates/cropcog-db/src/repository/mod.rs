//! # Repository Module
//!
//! The generic document repository interface and its adapters.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern Explained                         │
//! │                                                                         │
//! │  Service layer                                                         │
//! │       │                                                                 │
//! │       │  db.products().find_by_id("abc123")                            │
//! │       ▼                                                                 │
//! │  CrudRepository<Product>   (trait object: Arc<dyn ProductRepository>)  │
//! │  ├── save / save_all / insert / insert_all                             │
//! │  ├── find_by_id / exists_by_id / find_all_by_id                        │
//! │  ├── stream_all / find_all / find_all_sorted / find_page / count       │
//! │  └── delete_by_id / delete / delete_all / delete_all_by_id             │
//! │       │                                                                 │
//! │       ├──────────────────────┐                                         │
//! │       ▼                      ▼                                         │
//! │  SqliteRepository<T>    MongoRepository<T>                             │
//! │  documents table        MongoDB collection                             │
//! │                                                                         │
//! │  Every call is one independent round trip. No retries, no caching.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Modules
//!
//! - [`product`] - The `ProductRepository` interface
//! - [`sqlite`] - Embedded adapter storing JSON bodies
//! - [`mongo`] - Networked MongoDB adapter

pub mod mongo;
pub mod product;
pub mod sqlite;

use async_trait::async_trait;
use futures::stream::{BoxStream, TryStreamExt};
use serde::{Deserialize, Serialize};

use cropcog_core::Document;

use crate::error::{DbError, DbResult};

/// Lazy, finite sequence of documents. Each item is one decoded document or
/// the error that stopped the cursor.
pub type DocumentStream<'a, T> = BoxStream<'a, DbResult<T>>;

// =============================================================================
// Sorting and Paging
// =============================================================================

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Asc,
    Desc,
}

/// Sort order passed through to the store.
///
/// Field names are not checked against the entity. The field `"id"` sorts
/// by key on every backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    pub orders: Vec<(String, Direction)>,
}

impl Sort {
    /// No ordering (store default).
    pub fn unsorted() -> Self {
        Sort::default()
    }

    /// Ascending by one field.
    pub fn by(field: impl Into<String>) -> Self {
        Sort::unsorted().and(field, Direction::Asc)
    }

    /// Appends another ordering.
    pub fn and(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.orders.push((field.into(), direction));
        self
    }

    /// Reverses the direction of the most recently added ordering.
    pub fn descending(mut self) -> Self {
        if let Some((_, direction)) = self.orders.last_mut() {
            *direction = Direction::Desc;
        }
        self
    }

    pub fn is_unsorted(&self) -> bool {
        self.orders.is_empty()
    }
}

/// One page of a collection scan. Pages are zero-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u64,
    pub size: u64,
    #[serde(default)]
    pub sort: Sort,
}

impl PageRequest {
    pub fn of(page: u64, size: u64) -> Self {
        PageRequest {
            page,
            size,
            sort: Sort::unsorted(),
        }
    }

    /// Sets the sort order (builder style).
    pub fn sorted(mut self, sort: Sort) -> Self {
        self.sort = sort;
        self
    }

    /// Number of documents to skip.
    pub fn offset(&self) -> u64 {
        self.page.saturating_mul(self.size)
    }

    /// Rejects requests no store can answer.
    pub fn validate(&self) -> DbResult<()> {
        if self.size == 0 {
            return Err(DbError::InvalidArgument(
                "page size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// A page of results plus the collection total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page: u64,
    pub size: u64,
    pub total_elements: u64,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> u64 {
        if self.size == 0 {
            return 0;
        }
        self.total_elements.div_ceil(self.size)
    }

    pub fn has_next(&self) -> bool {
        self.page + 1 < self.total_pages()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

// =============================================================================
// CrudRepository
// =============================================================================

/// Identity-keyed CRUD over one document collection.
///
/// Implementations hold a cheap handle to the store and no other state.
/// A missing key is never an error: reads return `None`/`false`/an empty
/// result and deletes are no-ops.
#[async_trait]
pub trait CrudRepository<T: Document>: Send + Sync {
    /// Name of the collection this repository reads and writes.
    fn collection(&self) -> &str;

    /// Upserts one document (full replace). Generates the key when absent.
    async fn save(&self, entity: T) -> DbResult<T>;

    /// Upserts many documents, returning them in input order.
    ///
    /// Partial failure policy is backend specific; see the adapter docs.
    async fn save_all(&self, entities: Vec<T>) -> DbResult<Vec<T>>;

    /// Creates one document. Fails with `DbError::Conflict` if the key exists.
    async fn insert(&self, entity: T) -> DbResult<T>;

    /// Creates many documents, returning them in input order.
    async fn insert_all(&self, entities: Vec<T>) -> DbResult<Vec<T>>;

    async fn find_by_id(&self, id: &str) -> DbResult<Option<T>>;

    async fn exists_by_id(&self, id: &str) -> DbResult<bool>;

    /// Lazily yields every document. Order is unspecified.
    fn stream_all(&self) -> DocumentStream<'_, T>;

    /// Collects [`CrudRepository::stream_all`].
    async fn find_all(&self) -> DbResult<Vec<T>> {
        self.stream_all().try_collect().await
    }

    /// Every document, ordered by the given sort.
    async fn find_all_sorted(&self, sort: &Sort) -> DbResult<Vec<T>>;

    /// One page of documents plus the collection total.
    async fn find_page(&self, request: &PageRequest) -> DbResult<Page<T>>;

    /// Documents whose key is in `ids`. Missing keys are left out silently.
    async fn find_all_by_id(&self, ids: &[String]) -> DbResult<Vec<T>>;

    async fn count(&self) -> DbResult<u64>;

    async fn delete_by_id(&self, id: &str) -> DbResult<()>;

    /// Removes the document stored under the entity's key.
    ///
    /// An entity without a key was never stored, so this is a no-op.
    async fn delete(&self, entity: &T) -> DbResult<()> {
        match entity.key() {
            Some(key) => self.delete_by_id(key).await,
            None => Ok(()),
        }
    }

    /// Removes every document whose key is in `ids`.
    async fn delete_all_by_id(&self, ids: &[String]) -> DbResult<()>;

    /// Removes exactly the given entities' documents.
    async fn delete_all_entities(&self, entities: &[T]) -> DbResult<()> {
        let ids: Vec<String> = entities
            .iter()
            .filter_map(|entity| entity.key().map(str::to_string))
            .collect();
        if ids.is_empty() {
            return Ok(());
        }
        self.delete_all_by_id(&ids).await
    }

    /// Removes every document in the collection.
    async fn delete_all(&self) -> DbResult<()>;
}
