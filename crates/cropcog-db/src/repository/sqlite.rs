//! # SQLite Document Repository
//!
//! Stores documents as JSON bodies in a single `documents` table.
//!
//! ## Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  documents                                                              │
//! │  ┌────────────┬──────────┬──────────────────────────────────────────┐  │
//! │  │ collection │ id       │ body (JSON, key removed)                 │  │
//! │  ├────────────┼──────────┼──────────────────────────────────────────┤  │
//! │  │ product    │ 6f1c...  │ {"name":"Seed A","price_cents":450,...}  │  │
//! │  │ product    │ 9a2e...  │ {"name":"Seed B","price_cents":120,...}  │  │
//! │  └────────────┴──────────┴──────────────────────────────────────────┘  │
//! │  PRIMARY KEY (collection, id)                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Batch Writes
//! `save_all` and `insert_all` run in one transaction: either every
//! document is written or, on the first failure, none are.

use std::marker::PhantomData;

use async_trait::async_trait;
use futures::StreamExt;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, warn};
use uuid::Uuid;

use cropcog_core::Document;

use crate::codec;
use crate::error::{DbError, DbResult};
use crate::repository::{CrudRepository, Direction, DocumentStream, Page, PageRequest, Sort};

/// SQLite caps bound parameters per statement; stay well below it.
const MAX_KEYS_PER_STATEMENT: usize = 500;

const UPSERT_SQL: &str = r#"
    INSERT INTO documents (collection, id, body)
    VALUES (?1, ?2, ?3)
    ON CONFLICT (collection, id) DO UPDATE SET body = excluded.body
"#;

const INSERT_SQL: &str = r#"
    INSERT INTO documents (collection, id, body)
    VALUES (?1, ?2, ?3)
"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteMode {
    Upsert,
    Insert,
}

impl WriteMode {
    fn sql(self) -> &'static str {
        match self {
            WriteMode::Upsert => UPSERT_SQL,
            WriteMode::Insert => INSERT_SQL,
        }
    }
}

/// Generates a key for a document saved without one.
pub fn generate_key() -> String {
    Uuid::new_v4().to_string()
}

/// Repository for one collection in the SQLite `documents` table.
///
/// ## Usage
/// ```rust,ignore
/// let repo = SqliteRepository::<Product>::new(pool);
/// let saved = repo.save(Product::new("Seed A")).await?;
/// let loaded = repo.find_by_id(saved.id.as_deref().unwrap()).await?;
/// ```
#[derive(Debug, Clone)]
pub struct SqliteRepository<T> {
    pool: SqlitePool,
    collection: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Document> SqliteRepository<T> {
    /// Creates a repository for the entity's conventional collection.
    pub fn new(pool: SqlitePool) -> Self {
        Self::with_collection(pool, T::collection_name())
    }

    /// Creates a repository for an explicitly named collection.
    pub fn with_collection(pool: SqlitePool, collection: impl Into<String>) -> Self {
        SqliteRepository {
            pool,
            collection: collection.into(),
            _marker: PhantomData,
        }
    }

    /// Assigns a key if absent and encodes the body.
    fn prepare(mut entity: T) -> DbResult<(String, String, T)> {
        let key = match entity.key() {
            Some(key) => key.to_string(),
            None => {
                let key = generate_key();
                entity.set_id(key.clone());
                key
            }
        };
        let body = codec::encode_json(&entity)?;
        Ok((key, body, entity))
    }

    async fn write_one(
        &self,
        conn: &mut SqliteConnection,
        mode: WriteMode,
        key: &str,
        body: &str,
    ) -> DbResult<()> {
        sqlx::query(mode.sql())
            .bind(&self.collection)
            .bind(key)
            .bind(body)
            .execute(conn)
            .await
            .map_err(|e| DbError::from(e).in_context(&self.collection, Some(key)))?;
        Ok(())
    }

    async fn write(&self, entity: T, mode: WriteMode) -> DbResult<T> {
        let (key, body, entity) = Self::prepare(entity)?;
        debug!(collection = %self.collection, id = %key, ?mode, "Writing document");

        let mut conn = self.pool.acquire().await?;
        self.write_one(&mut conn, mode, &key, &body).await?;
        Ok(entity)
    }

    /// Writes every entity in one transaction. Nothing is kept on failure.
    async fn write_batch(&self, entities: Vec<T>, mode: WriteMode) -> DbResult<Vec<T>> {
        debug!(collection = %self.collection, count = entities.len(), ?mode, "Writing batch");

        let mut tx = self.pool.begin().await?;
        let mut written = Vec::with_capacity(entities.len());

        for (index, entity) in entities.into_iter().enumerate() {
            let (key, body, entity) = Self::prepare(entity)?;
            if let Err(e) = self.write_one(&mut tx, mode, &key, &body).await {
                warn!(
                    collection = %self.collection,
                    index,
                    id = %key,
                    error = %e,
                    "Batch write failed, rolling back"
                );
                // Dropping the transaction rolls it back
                return Err(e);
            }
            written.push(entity);
        }

        tx.commit().await?;
        Ok(written)
    }

    fn select_ordered(&self, sort: &Sort) -> DbResult<QueryBuilder<'static, Sqlite>> {
        let mut query = QueryBuilder::new("SELECT id, body FROM documents WHERE collection = ");
        query.push_bind(self.collection.clone());
        push_order_by::<T>(&mut query, sort)?;
        Ok(query)
    }
}

/// Appends `ORDER BY` for a pass-through sort, always ending on the key so
/// that pages are stable.
fn push_order_by<T: Document>(
    query: &mut QueryBuilder<'static, Sqlite>,
    sort: &Sort,
) -> DbResult<()> {
    query.push(" ORDER BY ");
    let mut terms = query.separated(", ");

    let mut sorted_by_key = false;
    for (field, direction) in &sort.orders {
        let direction = match direction {
            Direction::Asc => " ASC",
            Direction::Desc => " DESC",
        };

        if field == T::KEY_FIELD || field == codec::MONGO_KEY {
            terms.push(format!("id{}", direction));
            sorted_by_key = true;
        } else {
            terms.push("json_extract(body, ");
            terms.push_bind_unseparated(json_path(field)?);
            terms.push_unseparated(format!("){}", direction));
        }
    }

    if !sorted_by_key {
        terms.push("id ASC");
    }
    Ok(())
}

/// Turns a dotted field name into a quoted SQLite JSON path: `a.b` → `$."a"."b"`.
fn json_path(field: &str) -> DbResult<String> {
    if field.is_empty() || field.contains('"') {
        return Err(DbError::InvalidArgument(format!(
            "unsupported sort field: {:?}",
            field
        )));
    }

    let mut path = String::from("$");
    for segment in field.split('.') {
        if segment.is_empty() {
            return Err(DbError::InvalidArgument(format!(
                "unsupported sort field: {:?}",
                field
            )));
        }
        path.push_str(".\"");
        path.push_str(segment);
        path.push('"');
    }
    Ok(path)
}

fn decode_rows<T: Document>(rows: Vec<(String, String)>) -> DbResult<Vec<T>> {
    rows.iter()
        .map(|(id, body)| codec::decode_json(id, body))
        .collect()
}

#[async_trait]
impl<T: Document> CrudRepository<T> for SqliteRepository<T> {
    fn collection(&self) -> &str {
        &self.collection
    }

    async fn save(&self, entity: T) -> DbResult<T> {
        self.write(entity, WriteMode::Upsert).await
    }

    async fn save_all(&self, entities: Vec<T>) -> DbResult<Vec<T>> {
        self.write_batch(entities, WriteMode::Upsert).await
    }

    async fn insert(&self, entity: T) -> DbResult<T> {
        self.write(entity, WriteMode::Insert).await
    }

    async fn insert_all(&self, entities: Vec<T>) -> DbResult<Vec<T>> {
        self.write_batch(entities, WriteMode::Insert).await
    }

    async fn find_by_id(&self, id: &str) -> DbResult<Option<T>> {
        debug!(collection = %self.collection, id = %id, "Finding document");

        let body: Option<String> =
            sqlx::query_scalar("SELECT body FROM documents WHERE collection = ?1 AND id = ?2")
                .bind(&self.collection)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        body.map(|body| codec::decode_json(id, &body)).transpose()
    }

    async fn exists_by_id(&self, id: &str) -> DbResult<bool> {
        let found: i64 = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM documents WHERE collection = ?1 AND id = ?2)",
        )
        .bind(&self.collection)
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(found != 0)
    }

    fn stream_all(&self) -> DocumentStream<'_, T> {
        debug!(collection = %self.collection, "Streaming collection");

        sqlx::query_as::<_, (String, String)>(
            "SELECT id, body FROM documents WHERE collection = ?1",
        )
        .bind(self.collection.as_str())
        .fetch(&self.pool)
        .map(|row| -> DbResult<T> {
            let (id, body) = row?;
            codec::decode_json(&id, &body)
        })
        .boxed()
    }

    async fn find_all_sorted(&self, sort: &Sort) -> DbResult<Vec<T>> {
        debug!(collection = %self.collection, ?sort, "Finding sorted documents");

        let mut query = self.select_ordered(sort)?;
        let rows = query
            .build_query_as::<(String, String)>()
            .fetch_all(&self.pool)
            .await?;
        decode_rows(rows)
    }

    async fn find_page(&self, request: &PageRequest) -> DbResult<Page<T>> {
        request.validate()?;
        debug!(
            collection = %self.collection,
            page = request.page,
            size = request.size,
            "Finding page"
        );

        let limit = i64::try_from(request.size)
            .map_err(|_| DbError::InvalidArgument("page size too large".to_string()))?;
        let offset = i64::try_from(request.offset())
            .map_err(|_| DbError::InvalidArgument("page offset too large".to_string()))?;

        let mut query = self.select_ordered(&request.sort)?;
        query.push(" LIMIT ");
        query.push_bind(limit);
        query.push(" OFFSET ");
        query.push_bind(offset);

        let rows = query
            .build_query_as::<(String, String)>()
            .fetch_all(&self.pool)
            .await?;
        let total_elements = self.count().await?;

        Ok(Page {
            content: decode_rows(rows)?,
            page: request.page,
            size: request.size,
            total_elements,
        })
    }

    async fn find_all_by_id(&self, ids: &[String]) -> DbResult<Vec<T>> {
        debug!(collection = %self.collection, count = ids.len(), "Finding documents by id");

        let mut found = Vec::new();
        for chunk in ids.chunks(MAX_KEYS_PER_STATEMENT) {
            let mut query: QueryBuilder<'_, Sqlite> =
                QueryBuilder::new("SELECT id, body FROM documents WHERE collection = ");
            query.push_bind(self.collection.as_str());
            query.push(" AND id IN (");
            let mut keys = query.separated(", ");
            for id in chunk {
                keys.push_bind(id.as_str());
            }
            keys.push_unseparated(")");

            let rows = query
                .build_query_as::<(String, String)>()
                .fetch_all(&self.pool)
                .await?;
            found.extend(decode_rows::<T>(rows)?);
        }

        Ok(found)
    }

    async fn count(&self) -> DbResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE collection = ?1")
            .bind(&self.collection)
            .fetch_one(&self.pool)
            .await?;

        Ok(count.max(0) as u64)
    }

    async fn delete_by_id(&self, id: &str) -> DbResult<()> {
        debug!(collection = %self.collection, id = %id, "Deleting document");

        sqlx::query("DELETE FROM documents WHERE collection = ?1 AND id = ?2")
            .bind(&self.collection)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn delete_all_by_id(&self, ids: &[String]) -> DbResult<()> {
        debug!(collection = %self.collection, count = ids.len(), "Deleting documents by id");

        for chunk in ids.chunks(MAX_KEYS_PER_STATEMENT) {
            let mut query: QueryBuilder<'_, Sqlite> =
                QueryBuilder::new("DELETE FROM documents WHERE collection = ");
            query.push_bind(self.collection.as_str());
            query.push(" AND id IN (");
            let mut keys = query.separated(", ");
            for id in chunk {
                keys.push_bind(id.as_str());
            }
            keys.push_unseparated(")");

            query.build().execute(&self.pool).await?;
        }

        Ok(())
    }

    async fn delete_all(&self) -> DbResult<()> {
        debug!(collection = %self.collection, "Deleting all documents");

        let result = sqlx::query("DELETE FROM documents WHERE collection = ?1")
            .bind(&self.collection)
            .execute(&self.pool)
            .await?;

        debug!(removed = result.rows_affected(), "Collection cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_path_quotes_segments() {
        assert_eq!(json_path("name").unwrap(), r#"$."name""#);
        assert_eq!(json_path("dims.weight").unwrap(), r#"$."dims"."weight""#);
    }

    #[test]
    fn test_json_path_rejects_unquotable_fields() {
        assert!(json_path("").is_err());
        assert!(json_path("a..b").is_err());
        assert!(json_path(r#"na"me"#).is_err());
    }

    #[test]
    fn test_generated_keys_are_unique() {
        assert_ne!(generate_key(), generate_key());
    }
}
