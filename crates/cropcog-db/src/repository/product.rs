//! # Product Repository
//!
//! The named data-access interface for products.
//!
//! `ProductRepository` adds nothing to [`CrudRepository<Product>`]: every
//! operation is the generic one, bound to the `product` collection. The
//! blanket impl below makes any product-typed adapter usable through
//! `Arc<dyn ProductRepository>`.
//!
//! ## Operation Mapping
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Interface operation          Rust method                               │
//! │  ─────────────────────────    ───────────────────────────────────────   │
//! │  save(entity)                 save(Product)                             │
//! │  saveAll(entities)            save_all(Vec<Product>)                    │
//! │  findById(key)                find_by_id(&str)                          │
//! │  existsById(key)              exists_by_id(&str)                        │
//! │  findAll()                    stream_all() / find_all()                 │
//! │  findAllById(keys)            find_all_by_id(&[String])                 │
//! │  count()                      count()                                   │
//! │  deleteById(key)              delete_by_id(&str)                        │
//! │  delete(entity)               delete(&Product)                          │
//! │  deleteAll()                  delete_all()                              │
//! │  deleteAll(entities)          delete_all_entities(&[Product])           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use cropcog_core::Product;

use crate::config::Backend;
use crate::repository::{mongo, sqlite, CrudRepository};
use crate::repository::{mongo::MongoRepository, sqlite::SqliteRepository};

/// Identity-keyed CRUD over the product collection.
///
/// ## Usage
/// ```rust,ignore
/// let products: Arc<dyn ProductRepository> = db.products();
///
/// let saved = products.save(Product::new("Seed A")).await?;
/// let key = saved.id.clone().unwrap();
/// assert!(products.find_by_id(&key).await?.is_some());
///
/// products.delete_by_id(&key).await?;
/// assert!(products.find_by_id(&key).await?.is_none());
/// ```
pub trait ProductRepository: CrudRepository<Product> {}

impl<R: CrudRepository<Product> + ?Sized> ProductRepository for R {}

/// Product repository backed by the SQLite `documents` table.
pub type SqliteProductRepository = SqliteRepository<Product>;

/// Product repository backed by a MongoDB collection.
pub type MongoProductRepository = MongoRepository<Product>;

/// Generates a product key in the form the given backend assigns itself.
///
/// ## Usage
/// ```rust,ignore
/// let product = Product::new("Seed A").with_id(generate_product_id(db.backend()));
/// ```
pub fn generate_product_id(backend: Backend) -> String {
    match backend {
        Backend::Sqlite => sqlite::generate_key(),
        Backend::Mongo => mongo::generate_key(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_sqlite_product_ids_are_uuids() {
        let id = generate_product_id(Backend::Sqlite);
        assert!(Uuid::parse_str(&id).is_ok());
    }

    #[test]
    fn test_mongo_product_ids_are_object_ids() {
        let id = generate_product_id(Backend::Mongo);
        assert_eq!(id.len(), 24);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
