//! # Seed Data Generator
//!
//! Populates the product collection with demo products for development.
//!
//! ## Usage
//! ```bash
//! # Generate 500 products (default) in the store named by CROPCOG_STORE_URI
//! cargo run -p cropcog-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p cropcog-db --bin seed -- --count 2000
//!
//! # Point at another store
//! cargo run -p cropcog-db --bin seed -- --uri mongodb://localhost:27017
//! ```
//!
//! ## Generated Products
//! Names combine a crop with a product line:
//! - Seeds, seedlings, fertiliser, crop protection, tools
//!
//! Keys are left empty so the store assigns them on save.

use std::env;
use std::time::Instant;

use chrono::Utc;
use tracing::info;

use cropcog_core::Product;
use cropcog_db::logging::init_tracing;
use cropcog_db::migrations::migration_status;
use cropcog_db::{Database, StoreConfig};

const DEFAULT_COUNT: usize = 500;

/// Products are written in batches of this size.
const BATCH_SIZE: usize = 100;

/// Product lines with their category label and base price in cents.
const LINES: &[(&str, &str, i64)] = &[
    ("Seed", "seeds", 450),
    ("Seedlings Tray", "seedlings", 1200),
    ("Fertiliser 5kg", "fertiliser", 2400),
    ("Fungicide 1L", "crop-protection", 3100),
    ("Pruning Kit", "tools", 1850),
];

const CROPS: &[&str] = &[
    "Maize", "Wheat", "Sorghum", "Cassava", "Tomato", "Onion", "Cabbage", "Kale", "Bean",
    "Groundnut", "Sunflower", "Rice", "Potato", "Carrot", "Pepper", "Coffee", "Tea", "Avocado",
    "Mango", "Banana",
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut count: usize = DEFAULT_COUNT;
    let mut uri: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(DEFAULT_COUNT);
                    i += 1;
                }
            }
            "--uri" | "-u" => {
                if i + 1 < args.len() {
                    uri = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Cropcog Product Seeder");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!(
                    "  -c, --count <N>    Number of products to generate (default: {})",
                    DEFAULT_COUNT
                );
                println!("  -u, --uri <URI>    Store URI (default: $CROPCOG_STORE_URI)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let mut config = StoreConfig::load()?;
    if let Some(uri) = uri {
        config.uri = uri;
    }

    println!("🌱 Cropcog Product Seeder");
    println!("=========================");
    println!("Store:    {}", config.redacted_uri());
    println!("Products: {}", count);
    println!();

    let db = Database::connect(&config).await?;
    println!("✓ Connected to {:?} store", db.backend());

    if let Some(pool) = db.sqlite_pool() {
        let (total, applied) = migration_status(pool).await?;
        println!("✓ Migrations applied ({}/{})", applied, total);
    }

    let products = db.products();

    // Check existing products
    let existing = products.count().await?;
    if existing > 0 {
        println!(
            "⚠ Collection '{}' already has {} products",
            products.collection(),
            existing
        );
        println!("  Skipping seed to avoid duplicates.");
        return Ok(());
    }

    println!();
    println!("Generating products...");

    let start = Instant::now();
    let all: Vec<Product> = (0..count).map(generate_product).collect();

    let mut generated = 0;
    for batch in all.chunks(BATCH_SIZE) {
        let saved = products.save_all(batch.to_vec()).await?;
        generated += saved.len();
        info!(generated, "Batch saved");
    }

    let elapsed = start.elapsed();
    println!();
    println!("✓ Generated {} products in {:?}", generated, elapsed);
    println!(
        "  Rate: {:.0} products/second",
        generated as f64 / elapsed.as_secs_f64()
    );

    println!("✓ Collection now holds {} products", products.count().await?);

    db.close().await;
    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Generates a single product with realistic data.
fn generate_product(seed: usize) -> Product {
    let now = Utc::now();

    let (line, category, base_price) = LINES[seed % LINES.len()];
    let crop = CROPS[(seed / LINES.len()) % CROPS.len()];

    // Spread prices a little around the base so sorting has something to do
    let price_cents = base_price + ((seed * 37) % 500) as i64;

    let mut product = Product::new(format!("{} {}", crop, line))
        .with_category(category)
        .with_price_cents(price_cents)
        .with_quantity((seed % 151) as i64);
    product.description = Some(format!("{} for {} growers (lot {:05})", line, crop, seed));
    product.created_at = Some(now);
    product.updated_at = Some(now);
    product
}
