//! # Domain Types
//!
//! The Product entity persisted by the product store.
//!
//! ## Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              Product                                    │
//! │  ─────────────────────────────────────────────────────────────────────  │
//! │  id            Option<String>   primary key (absent until first save)   │
//! │  name          String                                                   │
//! │  description   Option<String>                                           │
//! │  category      Option<String>                                           │
//! │  price_cents   i64              smallest currency unit                  │
//! │  quantity      i64              units on hand                           │
//! │  image_url     Option<String>                                           │
//! │  created_at    Option<DateTime<Utc>>                                    │
//! │  updated_at    Option<DateTime<Utc>>                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The repository only ever reads `id`. Optional fields missing from a
//! stored document decode to `None`, numeric fields to zero.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::document::Document;

// =============================================================================
// Product
// =============================================================================

/// A product in the catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Primary key. Generated by the store on first save when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Display name.
    pub name: String,

    /// Optional long-form description.
    #[serde(default)]
    pub description: Option<String>,

    /// Free-form category label (e.g. "seeds", "fertiliser").
    #[serde(default)]
    pub category: Option<String>,

    /// Price in cents (smallest currency unit).
    #[serde(default)]
    pub price_cents: i64,

    /// Units on hand.
    #[serde(default)]
    pub quantity: i64,

    /// Link to a product image.
    #[serde(default)]
    pub image_url: Option<String>,

    /// When the product was created.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,

    /// When the product was last updated.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Product {
    /// Creates an unsaved product with only a name set.
    pub fn new(name: impl Into<String>) -> Self {
        Product {
            id: None,
            name: name.into(),
            description: None,
            category: None,
            price_cents: 0,
            quantity: 0,
            image_url: None,
            created_at: None,
            updated_at: None,
        }
    }

    /// Sets the key (builder style).
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the price in cents (builder style).
    pub fn with_price_cents(mut self, price_cents: i64) -> Self {
        self.price_cents = price_cents;
        self
    }

    /// Sets the category (builder style).
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Sets the quantity on hand (builder style).
    pub fn with_quantity(mut self, quantity: i64) -> Self {
        self.quantity = quantity;
        self
    }
}

impl Document for Product {
    const ENTITY: &'static str = "Product";

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_id(&mut self, id: String) {
        self.id = Some(id);
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_collection_name() {
        assert_eq!(Product::collection_name(), "product");
    }

    #[test]
    fn test_unsaved_product_omits_id() {
        let product = Product::new("Seed A");
        let json = serde_json::to_value(&product).unwrap();
        assert!(json.get("id").is_none());
        assert_eq!(json["name"], "Seed A");
    }

    #[test]
    fn test_missing_optional_fields_decode_to_defaults() {
        let product: Product = serde_json::from_str(r#"{"name":"Seed B"}"#).unwrap();
        assert_eq!(product, Product::new("Seed B"));
    }

    #[test]
    fn test_builders() {
        let product = Product::new("Wheat Seed")
            .with_id("p-1")
            .with_price_cents(1299)
            .with_category("seeds")
            .with_quantity(40);

        assert_eq!(product.id(), Some("p-1"));
        assert_eq!(product.price_cents, 1299);
        assert_eq!(product.category.as_deref(), Some("seeds"));
        assert_eq!(product.quantity, 40);
    }
}
