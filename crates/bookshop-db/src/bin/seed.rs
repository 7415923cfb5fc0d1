//! # Seed Data Generator
//!
//! Populates the database with starter accounts and a small catalog for
//! development.
//!
//! ## Usage
//! ```bash
//! # Seed the default development database
//! cargo run -p bookshop-db --bin seed
//!
//! # Specify database path
//! cargo run -p bookshop-db --bin seed -- --db ./data/bookshop.db
//! ```
//!
//! ## Generated Data
//! - Three accounts: `admin`, `staff`, and `customer` (password matches
//!   the username with a `-pass` suffix, e.g. `admin-pass`)
//! - A starter catalog of books with varied prices and stock levels,
//!   including one deliberately out-of-stock title

use chrono::Utc;
use std::env;
use uuid::Uuid;

use bookshop_core::{Item, ItemStatus, User, UserRole};
use bookshop_db::{Database, DbConfig};

/// Starter catalog: (name, description, price_cents, stock)
const CATALOG: &[(&str, &str, i64, i64)] = &[
    ("The Rust Programming Language", "Covers Rust from basics to advanced topics", 3999, 25),
    ("Designing Data-Intensive Applications", "The big ideas behind reliable systems", 4599, 12),
    ("Structure and Interpretation of Computer Programs", "The classic MIT text", 3499, 8),
    ("The Pragmatic Programmer", "From journeyman to master", 4299, 15),
    ("Clean Code", "A handbook of agile software craftsmanship", 3799, 20),
    ("Code Complete", "A practical handbook of software construction", 4199, 10),
    ("The Mythical Man-Month", "Essays on software engineering", 2999, 18),
    ("Refactoring", "Improving the design of existing code", 4499, 7),
    ("Introduction to Algorithms", "Comprehensive algorithms reference", 8999, 5),
    ("The C Programming Language", "The original K&R", 5499, 30),
    ("Programming Pearls", "Classic programming essays", 2799, 14),
    ("Working Effectively with Legacy Code", "Strategies for untangling old systems", 4099, 9),
    ("Domain-Driven Design", "Tackling complexity in the heart of software", 4899, 6),
    ("The Art of Computer Programming Vol 1", "Fundamental algorithms", 11999, 3),
    ("Compilers: Principles, Techniques, and Tools", "The dragon book", 7499, 0),
];

/// Starter accounts: (name, username, email, telephone, role, password)
const ACCOUNTS: &[(&str, &str, &str, &str, UserRole, &str)] = &[
    (
        "Admin User",
        "admin",
        "admin@bookshop.example",
        "5550000001",
        UserRole::Admin,
        "admin-pass",
    ),
    (
        "Staff User",
        "staff",
        "staff@bookshop.example",
        "5550000002",
        UserRole::Staff,
        "staff-pass",
    ),
    (
        "Sample Customer",
        "customer",
        "customer@bookshop.example",
        "5550000003",
        UserRole::Customer,
        "customer-pass",
    ),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./bookshop_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Bookshop Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./bookshop_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Bookshop Seed Data Generator");
    println!("===============================");
    println!("Database: {}", db_path);
    println!();

    // Connect to database
    let config = DbConfig::new(&db_path);
    let db = Database::new(config).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    // Check existing data
    let existing_items = db.items().count().await?;
    let existing_users = db.users().count().await?;
    if existing_items > 0 || existing_users > 0 {
        println!(
            "⚠ Database already has {} items and {} users",
            existing_items, existing_users
        );
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    // Seed accounts
    println!();
    println!("Creating accounts...");

    for (name, username, email, telephone, role, password) in ACCOUNTS {
        let user = User {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash: hash_password(password)?,
            address: None,
            telephone: telephone.to_string(),
            role: *role,
            created_at: Utc::now(),
        };

        db.users().insert(&user).await?;
        println!("  + {} ({:?})", username, role);
    }

    // Seed catalog
    println!();
    println!("Creating catalog...");

    let mut created = 0;
    for (name, description, price_cents, stock) in CATALOG {
        let now = Utc::now();
        let item = Item {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            description: Some(description.to_string()),
            price_cents: *price_cents,
            stock_quantity: *stock,
            status: ItemStatus::Active,
            created_at: now,
            updated_at: now,
        };

        if let Err(e) = db.items().insert(&item).await {
            eprintln!("Failed to insert {}: {}", name, e);
            continue;
        }
        created += 1;
    }

    println!("  + {} items", created);

    // Quick sanity check
    println!();
    println!("Verifying...");
    let active = db.items().list_active().await?;
    println!("  Active items: {}", active.len());
    let search = db.items().search_by_name("rust", 10).await?;
    println!("  Search 'rust': {} results", search.len());

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Hashes a starter password with argon2.
fn hash_password(password: &str) -> Result<String, Box<dyn std::error::Error>> {
    use argon2::{
        password_hash::{rand_core::OsRng, SaltString},
        Argon2, PasswordHasher,
    };

    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| format!("Failed to hash password: {}", e))?;

    Ok(hash.to_string())
}
