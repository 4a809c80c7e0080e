//! # Document Codec
//!
//! Explicit conversion between entities and the stored document shape.
//!
//! ## Key Placement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Where the key lives                                  │
//! │                                                                         │
//! │  Entity (serde)         { "id": "abc123", "name": "Seed A", ... }      │
//! │       │                                                                 │
//! │       ├── SQLite ──►  id column = "abc123"                             │
//! │       │               body      = { "name": "Seed A", ... }            │
//! │       │                                                                 │
//! │       └── MongoDB ─►  { "_id": "abc123", "name": "Seed A", ... }       │
//! │                       (24-hex keys are written as ObjectId)            │
//! │                                                                         │
//! │  Decoding reverses the move. The key is stored exactly once, so a      │
//! │  body can never disagree with its own key.                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing else in the document is read or rewritten.

use mongodb::bson::{self, oid::ObjectId, Bson, Document as BsonDocument};
use serde_json::{Map, Value};

use cropcog_core::Document;

use crate::error::{DbError, DbResult};

/// Name of the key field in a MongoDB document.
pub const MONGO_KEY: &str = "_id";

// =============================================================================
// JSON (SQLite bodies)
// =============================================================================

/// Encodes an entity as a JSON object body, without its key field.
pub fn encode_json<T: Document>(entity: &T) -> DbResult<String> {
    let mut object = to_json_object(entity)?;
    object.remove(T::KEY_FIELD);
    Ok(serde_json::to_string(&object)?)
}

/// Decodes a JSON body stored under `key` back into an entity.
pub fn decode_json<T: Document>(key: &str, body: &str) -> DbResult<T> {
    let mut object: Map<String, Value> = serde_json::from_str(body)?;
    object.insert(T::KEY_FIELD.to_string(), Value::String(key.to_string()));
    Ok(serde_json::from_value(Value::Object(object))?)
}

fn to_json_object<T: Document>(entity: &T) -> DbResult<Map<String, Value>> {
    match serde_json::to_value(entity)? {
        Value::Object(object) => Ok(object),
        other => Err(DbError::Serialization(format!(
            "{} must serialize to an object, got {}",
            T::ENTITY,
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// =============================================================================
// BSON (MongoDB documents)
// =============================================================================

/// Encodes an entity as a BSON document with its key moved to `_id`.
///
/// The entity must already carry a key.
pub fn encode_bson<T: Document>(entity: &T) -> DbResult<BsonDocument> {
    let key = entity.key().ok_or_else(|| {
        DbError::InvalidArgument(format!("{} has no key to encode", T::ENTITY))
    })?;

    let mut document = bson::to_document(entity)?;
    document.remove(T::KEY_FIELD);
    document.insert(MONGO_KEY, key_bson(key));
    Ok(document)
}

/// Decodes a BSON document into an entity, moving `_id` back to the key field.
///
/// Both string keys and ObjectId keys (written by other clients) are
/// accepted; ObjectIds become their hex form.
pub fn decode_bson<T: Document>(mut document: BsonDocument) -> DbResult<T> {
    let key = match document.remove(MONGO_KEY) {
        Some(Bson::String(key)) => key,
        Some(Bson::ObjectId(oid)) => oid.to_hex(),
        Some(other) => {
            return Err(DbError::Serialization(format!(
                "unsupported {} key type: {:?}",
                T::ENTITY,
                other.element_type()
            )));
        }
        None => {
            return Err(DbError::Serialization(format!(
                "{} document has no {} field",
                T::ENTITY,
                MONGO_KEY
            )));
        }
    };

    document.insert(T::KEY_FIELD, key);
    Ok(bson::from_document(document)?)
}

/// The `_id` value a key is written as.
///
/// Keys that parse as an ObjectId are stored as one, the same way other
/// MongoDB clients store string ids of that shape. Everything else stays a
/// string.
pub fn key_bson(key: &str) -> Bson {
    match ObjectId::parse_str(key) {
        Ok(oid) => Bson::ObjectId(oid),
        Err(_) => Bson::String(key.to_string()),
    }
}

/// Every `_id` form a key may be stored under.
///
/// MongoDB compares BSON types strictly, so an ObjectId-shaped key has to
/// match both its ObjectId and its string form.
fn key_forms(key: &str) -> Vec<Bson> {
    match ObjectId::parse_str(key) {
        Ok(oid) => vec![Bson::ObjectId(oid), Bson::String(key.to_string())],
        Err(_) => vec![Bson::String(key.to_string())],
    }
}

/// Filter document matching exactly one stored `_id` value.
pub fn id_filter(id: Bson) -> BsonDocument {
    let mut filter = BsonDocument::new();
    filter.insert(MONGO_KEY, id);
    filter
}

/// Filter document matching a single key, in any stored form.
pub fn key_filter(key: &str) -> BsonDocument {
    match key_forms(key).as_slice() {
        [only] => id_filter(only.clone()),
        forms => id_filter(Bson::Document(bson::doc! { "$in": forms.to_vec() })),
    }
}

/// Filter document matching any of the given keys, in any stored form.
pub fn keys_filter(keys: &[String]) -> BsonDocument {
    let forms: Vec<Bson> = keys.iter().flat_map(|key| key_forms(key)).collect();
    id_filter(Bson::Document(bson::doc! { "$in": forms }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cropcog_core::Product;
    use mongodb::bson::oid::ObjectId;

    fn seed_a() -> Product {
        Product::new("Seed A")
            .with_id("abc123")
            .with_price_cents(450)
            .with_category("seeds")
    }

    #[test]
    fn test_json_body_has_no_key() {
        let body = encode_json(&seed_a()).unwrap();
        let value: Value = serde_json::from_str(&body).unwrap();

        assert!(value.get("id").is_none());
        assert_eq!(value["name"], "Seed A");
        assert_eq!(value["price_cents"], 450);
    }

    #[test]
    fn test_json_decode_restores_key() {
        let body = encode_json(&seed_a()).unwrap();
        let decoded: Product = decode_json("abc123", &body).unwrap();
        assert_eq!(decoded, seed_a());
    }

    #[test]
    fn test_json_decode_prefers_column_key_over_body() {
        let decoded: Product =
            decode_json("from-column", r#"{"id":"stale","name":"Seed A"}"#).unwrap();
        assert_eq!(decoded.id.as_deref(), Some("from-column"));
    }

    #[test]
    fn test_json_decode_rejects_non_object() {
        let err = decode_json::<Product>("k", "[1,2,3]").unwrap_err();
        assert!(matches!(err, DbError::Serialization(_)));
    }

    #[test]
    fn test_bson_moves_key_to_underscore_id() {
        let document = encode_bson(&seed_a()).unwrap();

        assert_eq!(document.get_str("_id").unwrap(), "abc123");
        assert!(!document.contains_key("id"));
        assert_eq!(document.get_str("name").unwrap(), "Seed A");
    }

    #[test]
    fn test_bson_encode_requires_key() {
        let err = encode_bson(&Product::new("Seed A")).unwrap_err();
        assert!(matches!(err, DbError::InvalidArgument(_)));
    }

    #[test]
    fn test_bson_decode_restores_key() {
        let document = encode_bson(&seed_a()).unwrap();
        let decoded: Product = decode_bson(document).unwrap();
        assert_eq!(decoded, seed_a());
    }

    #[test]
    fn test_bson_decode_accepts_object_id() {
        let oid = ObjectId::new();
        let document = bson::doc! { "_id": oid, "name": "Seed B" };

        let decoded: Product = decode_bson(document).unwrap();
        assert_eq!(decoded.id, Some(oid.to_hex()));
        assert_eq!(decoded.name, "Seed B");
    }

    #[test]
    fn test_bson_decode_without_key_fails() {
        let err = decode_bson::<Product>(bson::doc! { "name": "Seed C" }).unwrap_err();
        assert!(matches!(err, DbError::Serialization(_)));
    }

    #[test]
    fn test_keys_filter_uses_in() {
        let filter = keys_filter(&["a".to_string(), "b".to_string()]);
        let inner = filter.get_document("_id").unwrap();
        assert_eq!(inner.get_array("$in").unwrap().len(), 2);
    }

    #[test]
    fn test_plain_key_filter_is_string_equality() {
        let filter = key_filter("abc123");
        assert_eq!(filter.get_str("_id").unwrap(), "abc123");
    }

    #[test]
    fn test_object_id_key_filter_matches_stored_object_id() {
        let oid = ObjectId::new();
        let stored = bson::doc! { "_id": oid, "name": "Seed A" };

        let product: Product = decode_bson(stored).unwrap();
        let filter = key_filter(product.id.as_deref().unwrap());

        let forms = filter.get_document("_id").unwrap().get_array("$in").unwrap();
        assert!(forms.contains(&Bson::ObjectId(oid)));
        assert!(forms.contains(&Bson::String(oid.to_hex())));
    }

    #[test]
    fn test_encode_hex_key_writes_object_id() {
        let oid = ObjectId::new();
        let stored = bson::doc! { "_id": oid, "name": "Seed A" };

        let product: Product = decode_bson(stored).unwrap();
        let document = encode_bson(&product).unwrap();

        assert_eq!(document.get_object_id("_id").unwrap(), oid);
    }

    #[test]
    fn test_keys_filter_expands_object_id_keys() {
        let oid = ObjectId::new();
        let filter = keys_filter(&[oid.to_hex(), "plain".to_string()]);

        let forms = filter.get_document("_id").unwrap().get_array("$in").unwrap();
        assert_eq!(forms.len(), 3);
        assert!(forms.contains(&Bson::ObjectId(oid)));
    }
}
