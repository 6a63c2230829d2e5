//! # Seed Users
//!
//! Writes user accounts into a file storage directory so a fresh shell has
//! someone to log in as.
//!
//! ## Usage
//! ```bash
//! # Built-in demo accounts into ./showroom_dev
//! cargo run -p showroom-store --bin seed
//!
//! # Accounts from a JSON document, replacing existing users
//! cargo run -p showroom-store --bin seed -- --users assets/data/users.json --force
//! ```

use std::env;
use std::fs;
use std::sync::Arc;

use serde_json::Value;

use showroom_core::{keys, EventBus};
use showroom_store::{demo_users, seed_users, FileStorage, StateStore};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut dir = String::from("./showroom_dev");
    let mut users_path: Option<String> = None;
    let mut force = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--dir" | "-d" => {
                if i + 1 < args.len() {
                    dir = args[i + 1].clone();
                    i += 1;
                }
            }
            "--users" | "-u" => {
                if i + 1 < args.len() {
                    users_path = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--force" | "-f" => force = true,
            "--help" | "-h" => {
                println!("Showroom User Seeder");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --dir <PATH>     Storage directory (default: ./showroom_dev)");
                println!("  -u, --users <PATH>   JSON array of user records (default: demo users)");
                println!("  -f, --force          Replace users that are already stored");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Showroom User Seeder");
    println!("=======================");
    println!("Storage: {}", dir);
    println!();

    let records = match &users_path {
        Some(path) => {
            let text = fs::read_to_string(path)?;
            let parsed: Value = serde_json::from_str(&text)?;
            match parsed {
                Value::Array(records) => records,
                _ => return Err(format!("{path} does not contain a JSON array").into()),
            }
        }
        None => demo_users(),
    };
    println!("✓ {} user record(s) to write", records.len());

    let storage = FileStorage::open(&dir)?;
    let store = StateStore::new(Arc::new(storage), EventBus::new());
    println!("✓ Storage opened");

    if force {
        store.remove(keys::USERS);
        println!("✓ Existing users cleared");
    }

    let written = seed_users(&store, records);
    if written == 0 {
        println!("⚠ Storage already has users");
        println!("  Skipping seed to avoid duplicates.");
        println!("  Pass --force to replace them.");
        return Ok(());
    }

    if !store.degraded_keys().is_empty() {
        return Err(format!("could not persist users into {dir}").into());
    }

    println!();
    println!("✅ Seeded {} user(s)", written);

    Ok(())
}
