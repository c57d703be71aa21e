//! # Seed Data Loader
//!
//! Fills a fresh database with starter branches, a product catalog and one
//! bootstrap manager account. Roles and expense categories come from the
//! migrations themselves.
//!
//! ## Usage
//! ```bash
//! # Seed the default database
//! cargo run -p store-db --bin seed
//!
//! # Specify database path and the bootstrap password
//! cargo run -p store-db --bin seed -- --db ./data/store.db --password 'Str0ngPass'
//! ```
//!
//! The bootstrap account logs in as `admin@sweetstore.local`.

use std::env;

use anyhow::{bail, Context};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
    Argon2,
};
use chrono::Utc;
use store_core::{NewBranch, NewEmployee, NewProduct};
use store_db::{Database, DbConfig};

const ADMIN_EMAIL: &str = "admin@sweetstore.local";
const ADMIN_IDENTITY_CARD: i64 = 10_000_001;

/// (name, address, city, country)
const BRANCHES: &[(&str, &str, &str, &str)] = &[
    ("Downtown", "12 Tahrir Square", "Cairo", "Egypt"),
    ("Heliopolis", "48 Baghdad Street", "Cairo", "Egypt"),
    ("Corniche", "7 Corniche Road", "Alexandria", "Egypt"),
];

/// (name, description, price in cents)
const PRODUCTS: &[(&str, &str, i64)] = &[
    ("Chocolate Cake", "Three-layer chocolate sponge", 2500),
    ("Baklava Tray", "Pistachio baklava, 24 pieces", 1800),
    ("Basbousa", "Semolina cake with syrup", 900),
    ("Konafa", "Shredded pastry with cream", 1200),
    ("Croissant", "Butter croissant", 250),
    ("Cheesecake", "New York style, whole", 2900),
    ("Date Maamoul", "Date-filled cookies, box of 12", 1100),
    ("Fruit Tart", "Seasonal fruit on custard", 1600),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./sweet_store_dev.db");
    let mut password = env::var("SEED_ADMIN_PASSWORD").unwrap_or_else(|_| "ChangeMe123".into());

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--password" | "-p" => {
                if i + 1 < args.len() {
                    password = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Sweet Store Seed Data Loader");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>          Database file path (default: ./sweet_store_dev.db)");
                println!("  -p, --password <PASS>    Bootstrap manager password");
                println!("                           (default: $SEED_ADMIN_PASSWORD or ChangeMe123)");
                println!("  -h, --help               Show this help message");
                return Ok(());
            }
            other => bail!("Unknown argument: {other}"),
        }
        i += 1;
    }

    if !store_core::schemas::is_strong_password(&password) {
        bail!("Bootstrap password needs 8+ characters with a lowercase, an uppercase letter and a digit");
    }

    println!("Sweet Store Seed Data Loader");
    println!("============================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path))
        .await
        .context("opening database")?;
    println!("✓ Connected and migrated");

    let existing = db.branches().list().await?;
    if !existing.is_empty() {
        println!("⚠ Database already has {} branches", existing.len());
        println!("  Skipping seed to avoid duplicates.");
        return Ok(());
    }

    let mut first_branch = None;
    for (name, address, city, country) in BRANCHES {
        let branch = db
            .branches()
            .create(&NewBranch {
                branch_name: name.to_string(),
                address: address.to_string(),
                city: city.to_string(),
                postal_code: None,
                country: country.to_string(),
                phone: None,
                email: None,
            })
            .await
            .with_context(|| format!("creating branch {name}"))?;
        first_branch.get_or_insert(branch.branch_id);
    }
    println!("✓ {} branches", BRANCHES.len());

    for (name, description, price_cents) in PRODUCTS {
        db.products()
            .create(&NewProduct {
                product_name: name.to_string(),
                description: Some(description.to_string()),
                base_price_cents: *price_cents,
            })
            .await
            .with_context(|| format!("creating product {name}"))?;
    }
    println!("✓ {} products", PRODUCTS.len());

    let Some(branch_id) = first_branch else {
        bail!("no branch was created");
    };
    let manager = db
        .employees()
        .roles()
        .await?
        .into_iter()
        .find(|role| role.name == "manager")
        .context("manager role missing; were migrations applied?")?;

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("hashing bootstrap password: {e}"))?
        .to_string();

    let admin = db
        .employees()
        .create(
            &NewEmployee {
                identity_card: ADMIN_IDENTITY_CARD,
                first_name: "Store".to_string(),
                last_name: "Admin".to_string(),
                email: ADMIN_EMAIL.to_string(),
                password: password.clone(),
                phone_number: None,
                address: None,
                hire_date: Utc::now(),
                hourly_wage_cents: 0,
                branch_id,
                role_id: manager.role_id,
            },
            &password_hash,
        )
        .await
        .context("creating bootstrap employee")?;
    println!("✓ Bootstrap manager {} (id {})", ADMIN_EMAIL, admin.employee.id);

    println!();
    println!("✓ Seed complete!");
    db.close().await;
    Ok(())
}
