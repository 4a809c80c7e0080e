//! Product repository behaviour against a live MongoDB deployment.
//!
//! Ignored by default. Run with:
//! ```bash
//! CROPCOG_TEST_MONGO_URI=mongodb://localhost:27017 cargo test -p cropcog-db -- --ignored
//! ```

use std::sync::Arc;

use mongodb::bson::{doc, oid::ObjectId, Document as BsonDocument};
use uuid::Uuid;

use cropcog_core::Product;
use cropcog_db::{
    Backend, Database, DbError, PageRequest, ProductRepository, Sort, StoreConfig,
};

const TEST_DATABASE: &str = "cropcog_test";

fn test_uri() -> String {
    std::env::var("CROPCOG_TEST_MONGO_URI")
        .expect("CROPCOG_TEST_MONGO_URI must be set for MongoDB tests")
}

/// Connects with a fresh collection so concurrent runs never collide.
async fn setup() -> (Database, Arc<dyn ProductRepository>) {
    let collection = format!("product_test_{}", Uuid::new_v4().simple());
    let config = StoreConfig::new(test_uri())
        .database(TEST_DATABASE)
        .collection(collection);

    let db = Database::connect(&config).await.expect("MongoDB reachable");
    let products = db.products();
    (db, products)
}

#[tokio::test]
#[ignore]
async fn test_mongo_save_find_delete_scenario() {
    let (db, products) = setup().await;
    assert_eq!(db.backend(), Backend::Mongo);
    assert!(db.health_check().await);

    let saved = products.save(Product::new("Seed A")).await.unwrap();
    let key = saved.id.clone().unwrap();
    assert_eq!(key.len(), 24);

    assert_eq!(products.find_by_id(&key).await.unwrap(), Some(saved));

    products.delete_by_id(&key).await.unwrap();
    assert_eq!(products.find_by_id(&key).await.unwrap(), None);

    products.delete_all().await.unwrap();
}

#[tokio::test]
#[ignore]
async fn test_mongo_save_twice_replaces_document() {
    let (_db, products) = setup().await;

    let mut saved = products.save(Product::new("Seed A")).await.unwrap();
    saved.price_cents = 999;
    products.save(saved.clone()).await.unwrap();

    assert_eq!(products.count().await.unwrap(), 1);
    let loaded = products
        .find_by_id(saved.id.as_deref().unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(loaded.price_cents, 999);

    products.delete_all().await.unwrap();
}

#[tokio::test]
#[ignore]
async fn test_mongo_insert_conflict() {
    let (_db, products) = setup().await;

    products.insert(Product::new("Seed A").with_id("p-1")).await.unwrap();
    let err = products
        .insert(Product::new("Seed A (copy)").with_id("p-1"))
        .await
        .unwrap_err();

    assert!(err.is_conflict(), "unexpected error: {err:?}");
    let stored = products.find_by_id("p-1").await.unwrap().unwrap();
    assert_eq!(stored.name, "Seed A");

    products.delete_all().await.unwrap();
}

#[tokio::test]
#[ignore]
async fn test_mongo_insert_all_keeps_written_prefix() {
    let (_db, products) = setup().await;

    let batch = vec![
        Product::new("Seed A").with_id("x"),
        Product::new("Seed B").with_id("y"),
        Product::new("Seed C").with_id("x"),
        Product::new("Seed D").with_id("z"),
    ];
    let err = products.insert_all(batch).await.unwrap_err();

    assert!(matches!(err, DbError::Conflict { .. }));
    assert_eq!(products.count().await.unwrap(), 2);
    assert!(!products.exists_by_id("z").await.unwrap());

    products.delete_all().await.unwrap();
}

#[tokio::test]
#[ignore]
async fn test_mongo_batches_and_paging() {
    let (_db, products) = setup().await;

    let saved = products
        .save_all((0..7).map(|i| Product::new(format!("P{i}"))).collect())
        .await
        .unwrap();
    let names: Vec<&str> = saved.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["P0", "P1", "P2", "P3", "P4", "P5", "P6"]);

    let page = products
        .find_page(&PageRequest::of(1, 3).sorted(Sort::by("name")))
        .await
        .unwrap();
    let page_names: Vec<&str> = page.content.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(page_names, vec!["P3", "P4", "P5"]);
    assert_eq!(page.total_elements, 7);

    let ids = vec![saved[0].id.clone().unwrap(), "missing".to_string()];
    assert_eq!(products.find_all_by_id(&ids).await.unwrap().len(), 1);

    products
        .delete_all_entities(&[saved[0].clone(), saved[1].clone()])
        .await
        .unwrap();
    assert_eq!(products.find_all().await.unwrap().len(), 5);

    products.delete_all().await.unwrap();
    assert_eq!(products.count().await.unwrap(), 0);
}

#[tokio::test]
#[ignore]
async fn test_mongo_object_id_documents_written_elsewhere() {
    let (_db, products) = setup().await;

    // Write the document the way another client would: `_id` as an ObjectId
    let client = mongodb::Client::with_uri_str(test_uri()).await.unwrap();
    let raw = client
        .database(TEST_DATABASE)
        .collection::<BsonDocument>(products.collection());
    let oid = ObjectId::new();
    raw.insert_one(doc! { "_id": oid, "name": "Seed A", "price_cents": 450_i64 })
        .await
        .unwrap();

    let key = oid.to_hex();
    let found = products.find_by_id(&key).await.unwrap().unwrap();
    assert_eq!(found.id.as_deref(), Some(key.as_str()));
    assert!(products.exists_by_id(&key).await.unwrap());
    assert_eq!(products.find_all_by_id(&[key.clone()]).await.unwrap().len(), 1);

    let mut updated = found.clone();
    updated.price_cents = 500;
    products.save(updated).await.unwrap();
    assert_eq!(products.count().await.unwrap(), 1);

    let stored = raw.find_one(doc! { "_id": oid }).await.unwrap().unwrap();
    assert_eq!(stored.get_i64("price_cents").unwrap(), 500);

    let err = products
        .insert(Product::new("Seed A (copy)").with_id(key.clone()))
        .await
        .unwrap_err();
    assert!(err.is_conflict());

    products.delete_by_id(&key).await.unwrap();
    assert_eq!(products.count().await.unwrap(), 0);
}
