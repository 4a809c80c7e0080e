//! # cropcog-core: Entity Types for the Product Store
//!
//! This crate defines the records the product store persists. It has no
//! I/O dependencies; everything that touches a database lives in
//! `cropcog-db`.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cropcog Product Store                                │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            Service / HTTP layer (outside this workspace)        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ cropcog-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐   ┌──────────────┐   ┌───────────┐             │   │
//! │  │   │   types   │   │   document   │   │   error   │             │   │
//! │  │   │  Product  │   │ Document key │   │ CoreError │             │   │
//! │  │   │           │   │ + collection │   │           │             │   │
//! │  │   └───────────┘   └──────────────┘   └───────────┘             │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK                             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                cropcog-db (Document store access)               │   │
//! │  │          CrudRepository, SQLite adapter, MongoDB adapter        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product)
//! - [`document`] - The `Document` trait every persisted entity implements
//! - [`error`] - Core error types
//!
//! ## Example Usage
//!
//! ```rust
//! use cropcog_core::{Document, Product};
//!
//! let product = Product::new("Seed A");
//! assert!(product.id().is_none());
//! assert_eq!(Product::collection_name(), "product");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod document;
pub mod error;
pub mod types;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use document::{validate_collection_name, Document};
pub use error::{CoreError, CoreResult};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Longest collection name accepted by [`validate_collection_name`].
///
/// MongoDB caps the full namespace (`database.collection`) at 255 bytes;
/// 120 leaves room for any reasonable database name.
pub const MAX_COLLECTION_NAME_LEN: usize = 120;
