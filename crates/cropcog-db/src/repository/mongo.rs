//! # MongoDB Document Repository
//!
//! Stores each entity as one document in a MongoDB collection, keyed by `_id`.
//!
//! ## Request Mapping
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Repository call          MongoDB command                               │
//! │  ─────────────────────    ───────────────────────────────────────────   │
//! │  save                     findOne({_id}) then                           │
//! │                           replaceOne({_id}, doc, upsert: true)          │
//! │  insert                   insertOne(doc)                                │
//! │  find_by_id               findOne({_id})                                │
//! │  exists_by_id             countDocuments({_id}, limit: 1)               │
//! │  stream_all / find_all    find({})                                      │
//! │  find_all_sorted          find({}).sort(...)                            │
//! │  find_page                find({}).sort(...).skip(n).limit(m)           │
//! │  find_all_by_id           find({_id: {$in: [...]}})                     │
//! │  count                    countDocuments({})                            │
//! │  delete_by_id             deleteMany({_id})                             │
//! │  delete_all_by_id         deleteMany({_id: {$in: [...]}})               │
//! │  delete_all               deleteMany({})                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Keys
//! A key that parses as an ObjectId is written as one, and every filter
//! matches both its ObjectId and string form. Documents written by other
//! clients under either form are found, replaced and deleted in place.
//!
//! ## Batch Writes
//! `save_all` and `insert_all` are best-effort and ordered. Documents are
//! written one at a time; the first failure stops the batch and is returned
//! unchanged. Documents written before the failure stay persisted. MongoDB
//! only offers multi-document transactions on replica sets, so no rollback
//! is attempted.

use std::marker::PhantomData;

use async_trait::async_trait;
use futures::{stream, StreamExt, TryStreamExt};
use mongodb::bson::{oid::ObjectId, Bson, Document as BsonDocument};
use mongodb::{Collection, Database as MongoDatabase};
use tracing::{debug, warn};

use cropcog_core::Document;

use crate::codec;
use crate::error::{DbError, DbResult};
use crate::repository::{CrudRepository, Direction, DocumentStream, Page, PageRequest, Sort};

/// Generates a key for a document saved without one, in the form MongoDB
/// itself would assign.
pub fn generate_key() -> String {
    ObjectId::new().to_hex()
}

/// Repository for one MongoDB collection.
///
/// ## Usage
/// ```rust,ignore
/// let client = mongodb::Client::with_uri_str("mongodb://localhost:27017").await?;
/// let repo = MongoRepository::<Product>::new(&client.database("productdb"));
/// let saved = repo.save(Product::new("Seed A")).await?;
/// ```
#[derive(Debug, Clone)]
pub struct MongoRepository<T> {
    collection: Collection<BsonDocument>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Document> MongoRepository<T> {
    /// Creates a repository for the entity's conventional collection.
    pub fn new(database: &MongoDatabase) -> Self {
        Self::with_collection(database, &T::collection_name())
    }

    /// Creates a repository for an explicitly named collection.
    pub fn with_collection(database: &MongoDatabase, collection: &str) -> Self {
        MongoRepository {
            collection: database.collection(collection),
            _marker: PhantomData,
        }
    }

    fn name(&self) -> &str {
        self.collection.name()
    }

    /// Assigns a key if absent and encodes the document.
    fn prepare(mut entity: T) -> DbResult<(BsonDocument, T)> {
        if entity.key().is_none() {
            entity.set_id(generate_key());
        }
        let document = codec::encode_bson(&entity)?;
        Ok((document, entity))
    }

    /// The `_id` value an existing document is stored under, if any.
    async fn stored_id(&self, key: &str) -> DbResult<Option<Bson>> {
        let mut projection = BsonDocument::new();
        projection.insert(codec::MONGO_KEY, 1);

        let found = self
            .collection
            .find_one(codec::key_filter(key))
            .projection(projection)
            .await?;

        Ok(found.and_then(|mut document| document.remove(codec::MONGO_KEY)))
    }

    async fn upsert(&self, entity: T) -> DbResult<T> {
        let (mut document, entity) = Self::prepare(entity)?;
        let key = entity.key().unwrap_or_default();
        debug!(collection = %self.name(), id = %key, "Upserting document");

        // `_id` is immutable: replace in place under whatever form is stored
        let id = match self.stored_id(key).await? {
            Some(stored) => stored,
            None => codec::key_bson(key),
        };
        document.insert(codec::MONGO_KEY, id.clone());

        self.collection
            .replace_one(codec::id_filter(id), document)
            .upsert(true)
            .await
            .map_err(|e| DbError::from(e).in_context(self.name(), Some(key)))?;

        Ok(entity)
    }

    async fn create(&self, entity: T) -> DbResult<T> {
        let (document, entity) = Self::prepare(entity)?;
        let key = entity.key().unwrap_or_default();
        debug!(collection = %self.name(), id = %key, "Inserting document");

        // The unique `_id` index only sees one form of an ObjectId-shaped key
        if let Some(stored) = self.stored_id(key).await? {
            return Err(DbError::conflict(
                self.name(),
                key,
                format!("a document with _id {} already exists", stored),
            ));
        }

        self.collection
            .insert_one(document)
            .await
            .map_err(|e| DbError::from(e).in_context(self.name(), Some(key)))?;

        Ok(entity)
    }

    async fn collect(&self, filter: BsonDocument, sort: Option<&Sort>) -> DbResult<Vec<T>> {
        let find = self.collection.find(filter);
        let cursor = match sort {
            Some(sort) => find.sort(sort_document::<T>(sort)).await?,
            None => find.await?,
        };

        let documents: Vec<BsonDocument> = cursor.try_collect().await?;
        documents.into_iter().map(codec::decode_bson).collect()
    }
}

/// Builds a MongoDB sort document, mapping the key field to `_id` and
/// ending on `_id` so that pages are stable.
fn sort_document<T: Document>(sort: &Sort) -> BsonDocument {
    let mut document = BsonDocument::new();
    for (field, direction) in &sort.orders {
        let field = if field == T::KEY_FIELD {
            codec::MONGO_KEY
        } else {
            field.as_str()
        };
        let order = match direction {
            Direction::Asc => 1,
            Direction::Desc => -1,
        };
        document.insert(field, order);
    }

    if !document.contains_key(codec::MONGO_KEY) {
        document.insert(codec::MONGO_KEY, 1);
    }
    document
}

#[async_trait]
impl<T: Document> CrudRepository<T> for MongoRepository<T> {
    fn collection(&self) -> &str {
        self.name()
    }

    async fn save(&self, entity: T) -> DbResult<T> {
        self.upsert(entity).await
    }

    async fn save_all(&self, entities: Vec<T>) -> DbResult<Vec<T>> {
        debug!(collection = %self.name(), count = entities.len(), "Upserting batch");

        let mut written = Vec::with_capacity(entities.len());
        for (index, entity) in entities.into_iter().enumerate() {
            match self.upsert(entity).await {
                Ok(entity) => written.push(entity),
                Err(e) => {
                    warn!(
                        collection = %self.name(),
                        index,
                        persisted = written.len(),
                        error = %e,
                        "Batch upsert stopped, earlier documents remain persisted"
                    );
                    return Err(e);
                }
            }
        }
        Ok(written)
    }

    async fn insert(&self, entity: T) -> DbResult<T> {
        self.create(entity).await
    }

    async fn insert_all(&self, entities: Vec<T>) -> DbResult<Vec<T>> {
        debug!(collection = %self.name(), count = entities.len(), "Inserting batch");

        let mut written = Vec::with_capacity(entities.len());
        for (index, entity) in entities.into_iter().enumerate() {
            match self.create(entity).await {
                Ok(entity) => written.push(entity),
                Err(e) => {
                    warn!(
                        collection = %self.name(),
                        index,
                        persisted = written.len(),
                        error = %e,
                        "Batch insert stopped, earlier documents remain persisted"
                    );
                    return Err(e);
                }
            }
        }
        Ok(written)
    }

    async fn find_by_id(&self, id: &str) -> DbResult<Option<T>> {
        debug!(collection = %self.name(), id = %id, "Finding document");

        let document = self.collection.find_one(codec::key_filter(id)).await?;
        document.map(codec::decode_bson).transpose()
    }

    async fn exists_by_id(&self, id: &str) -> DbResult<bool> {
        let count = self
            .collection
            .count_documents(codec::key_filter(id))
            .limit(1)
            .await?;

        Ok(count > 0)
    }

    fn stream_all(&self) -> DocumentStream<'_, T> {
        debug!(collection = %self.name(), "Streaming collection");

        let collection = self.collection.clone();
        stream::once(async move { collection.find(BsonDocument::new()).await })
            .map_err(DbError::from)
            .map_ok(|cursor| {
                cursor.map(|document| -> DbResult<T> { codec::decode_bson(document?) })
            })
            .try_flatten()
            .boxed()
    }

    async fn find_all_sorted(&self, sort: &Sort) -> DbResult<Vec<T>> {
        debug!(collection = %self.name(), ?sort, "Finding sorted documents");
        self.collect(BsonDocument::new(), Some(sort)).await
    }

    async fn find_page(&self, request: &PageRequest) -> DbResult<Page<T>> {
        request.validate()?;
        debug!(
            collection = %self.name(),
            page = request.page,
            size = request.size,
            "Finding page"
        );

        let limit = i64::try_from(request.size)
            .map_err(|_| DbError::InvalidArgument("page size too large".to_string()))?;

        let cursor = self
            .collection
            .find(BsonDocument::new())
            .sort(sort_document::<T>(&request.sort))
            .skip(request.offset())
            .limit(limit)
            .await?;
        let documents: Vec<BsonDocument> = cursor.try_collect().await?;
        let content = documents
            .into_iter()
            .map(codec::decode_bson)
            .collect::<DbResult<Vec<T>>>()?;

        let total_elements = self.count().await?;

        Ok(Page {
            content,
            page: request.page,
            size: request.size,
            total_elements,
        })
    }

    async fn find_all_by_id(&self, ids: &[String]) -> DbResult<Vec<T>> {
        debug!(collection = %self.name(), count = ids.len(), "Finding documents by id");

        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.collect(codec::keys_filter(ids), None).await
    }

    async fn count(&self) -> DbResult<u64> {
        Ok(self.collection.count_documents(BsonDocument::new()).await?)
    }

    async fn delete_by_id(&self, id: &str) -> DbResult<()> {
        debug!(collection = %self.name(), id = %id, "Deleting document");

        self.collection.delete_many(codec::key_filter(id)).await?;
        Ok(())
    }

    async fn delete_all_by_id(&self, ids: &[String]) -> DbResult<()> {
        debug!(collection = %self.name(), count = ids.len(), "Deleting documents by id");

        if ids.is_empty() {
            return Ok(());
        }
        self.collection.delete_many(codec::keys_filter(ids)).await?;
        Ok(())
    }

    async fn delete_all(&self) -> DbResult<()> {
        debug!(collection = %self.name(), "Deleting all documents");

        let result = self.collection.delete_many(BsonDocument::new()).await?;
        debug!(removed = result.deleted_count, "Collection cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cropcog_core::Product;

    #[test]
    fn test_generated_keys_are_object_id_hex() {
        let key = generate_key();
        assert_eq!(key.len(), 24);
        assert!(ObjectId::parse_str(&key).is_ok());
    }

    #[test]
    fn test_sort_document_maps_key_field() {
        let sort = Sort::by("name").and("id", Direction::Desc);
        let document = sort_document::<Product>(&sort);

        let fields: Vec<&str> = document.keys().map(String::as_str).collect();
        assert_eq!(fields, vec!["name", "_id"]);
        assert_eq!(document.get_i32("name").unwrap(), 1);
        assert_eq!(document.get_i32("_id").unwrap(), -1);
    }

    #[test]
    fn test_sort_document_appends_key_tiebreak() {
        let document = sort_document::<Product>(&Sort::by("price_cents").descending());

        let fields: Vec<&str> = document.keys().map(String::as_str).collect();
        assert_eq!(fields, vec!["price_cents", "_id"]);
        assert_eq!(document.get_i32("price_cents").unwrap(), -1);
    }

    #[test]
    fn test_prepare_assigns_missing_key() {
        let (document, product) =
            MongoRepository::<Product>::prepare(Product::new("Seed A")).unwrap();

        let key = product.id.clone().unwrap();
        assert_eq!(document.get_object_id("_id").unwrap().to_hex(), key);
    }

    #[test]
    fn test_prepare_keeps_caller_key() {
        let (document, product) =
            MongoRepository::<Product>::prepare(Product::new("Seed A").with_id("abc123")).unwrap();

        assert_eq!(product.id.as_deref(), Some("abc123"));
        assert_eq!(document.get_str("_id").unwrap(), "abc123");
    }
}
