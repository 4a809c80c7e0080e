//! # Document Trait
//!
//! The contract between an entity type and the generic repository.
//!
//! ## Identity and Collections
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    How an entity maps to the store                      │
//! │                                                                         │
//! │  struct Product { id: Option<String>, name, ... }                      │
//! │       │                                                                 │
//! │       │  Document::ENTITY = "Product"                                  │
//! │       │  Document::COLLECTION = None                                   │
//! │       ▼                                                                 │
//! │  collection_name() = "product"     (first letter lower-cased)          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────┐                           │
//! │  │ collection "product"                    │                           │
//! │  │  key "abc123" → { name: "Seed A", ... } │                           │
//! │  │  key "def456" → { name: "Seed B", ... } │                           │
//! │  └─────────────────────────────────────────┘                           │
//! │                                                                         │
//! │  Everything except the key is opaque to the repository.                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{de::DeserializeOwned, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::MAX_COLLECTION_NAME_LEN;

/// A record that can be stored in a document collection.
///
/// The repository reads only the key. Every other field travels through
/// serde untouched.
pub trait Document: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Entity type name, used to derive the default collection name.
    const ENTITY: &'static str;

    /// Explicit collection name. Takes precedence over the derived one.
    const COLLECTION: Option<&'static str> = None;

    /// Serialized name of the key field.
    const KEY_FIELD: &'static str = "id";

    /// Returns the primary key, if one has been assigned.
    fn id(&self) -> Option<&str>;

    /// Assigns the primary key.
    fn set_id(&mut self, id: String);

    /// Returns the key only when it is present and non-empty.
    ///
    /// An empty string is treated the same as a missing key.
    fn key(&self) -> Option<&str> {
        self.id().filter(|id| !id.is_empty())
    }

    /// Name of the collection this entity lives in.
    fn collection_name() -> String {
        match Self::COLLECTION {
            Some(name) => name.to_string(),
            None => uncapitalize(Self::ENTITY),
        }
    }
}

fn uncapitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Checks a collection name against the rules document stores enforce.
///
/// ## Example
/// ```rust
/// use cropcog_core::validate_collection_name;
///
/// assert!(validate_collection_name("product").is_ok());
/// assert!(validate_collection_name("").is_err());
/// assert!(validate_collection_name("system.users").is_err());
/// ```
pub fn validate_collection_name(name: &str) -> CoreResult<()> {
    if name.trim().is_empty() {
        return Err(CoreError::invalid_collection(name, "must not be empty"));
    }

    if name.len() > MAX_COLLECTION_NAME_LEN {
        return Err(CoreError::invalid_collection(
            name,
            format!("must be at most {} bytes", MAX_COLLECTION_NAME_LEN),
        ));
    }

    if name.contains('$') {
        return Err(CoreError::invalid_collection(name, "must not contain '$'"));
    }

    if name.contains('\0') {
        return Err(CoreError::invalid_collection(
            name,
            "must not contain a NUL byte",
        ));
    }

    if name.starts_with("system.") {
        return Err(CoreError::invalid_collection(
            name,
            "the 'system.' prefix is reserved",
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct SeedLot {
        id: Option<String>,
    }

    impl Document for SeedLot {
        const ENTITY: &'static str = "SeedLot";

        fn id(&self) -> Option<&str> {
            self.id.as_deref()
        }

        fn set_id(&mut self, id: String) {
            self.id = Some(id);
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Archived {
        id: Option<String>,
    }

    impl Document for Archived {
        const ENTITY: &'static str = "Archived";
        const COLLECTION: Option<&'static str> = Some("archived_products");

        fn id(&self) -> Option<&str> {
            self.id.as_deref()
        }

        fn set_id(&mut self, id: String) {
            self.id = Some(id);
        }
    }

    #[test]
    fn test_collection_name_is_uncapitalized_entity() {
        assert_eq!(SeedLot::collection_name(), "seedLot");
    }

    #[test]
    fn test_collection_override_wins() {
        assert_eq!(Archived::collection_name(), "archived_products");
    }

    #[test]
    fn test_empty_key_counts_as_missing() {
        let lot = SeedLot {
            id: Some(String::new()),
        };
        assert!(lot.key().is_none());

        let mut lot = SeedLot { id: None };
        lot.set_id("lot-1".to_string());
        assert_eq!(lot.key(), Some("lot-1"));
    }

    #[test]
    fn test_validate_collection_name() {
        assert!(validate_collection_name("product").is_ok());
        assert!(validate_collection_name("  ").is_err());
        assert!(validate_collection_name("pro$duct").is_err());
        assert!(validate_collection_name("a\0b").is_err());
        assert!(validate_collection_name("system.indexes").is_err());
        assert!(validate_collection_name(&"p".repeat(MAX_COLLECTION_NAME_LEN + 1)).is_err());
    }
}
