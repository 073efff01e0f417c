//! Demonstrates the CensusDB record lifecycle and index lookups.
//!
//! Run with: cargo run -p censusdb --example crud_demo

use censusdb::logging::LogConfig;
use censusdb::{Occupation, Record, RecordKey, RecordPatch, State, Store, StoreConfig};
use std::path::Path;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _guard = LogConfig::info().init();

    let data_dir = "./demo_census_data";

    println!("=== CensusDB CRUD Demo ===\n");

    // Clean up any previous demo data
    if Path::new(data_dir).exists() {
        std::fs::remove_dir_all(data_dir)?;
        println!("Cleaned up previous demo data\n");
    }

    let store = Store::open(StoreConfig {
        data_dir: data_dir.into(),
        ..Default::default()
    })?;

    println!("1. Creating records...");
    store.create(Record::new(
        RecordKey::new("123456789")?,
        State::California,
        Occupation::Engineer,
    ))?;
    store.create(Record::new(
        RecordKey::new("987654321")?,
        State::NewYork,
        Occupation::Teacher,
    ))?;
    store.create(Record::new(
        RecordKey::new("555123456")?,
        State::California,
        Occupation::Nurse,
    ))?;
    println!("   Created 3 records\n");

    println!("2. Point lookups...");
    if let Some(record) = store.get(&RecordKey::new("123456789")?)? {
        println!("   {} -> {}, {}", record.key, record.state, record.occupation);
    }

    println!("\n3. Index lookups...");
    let californians = store.lookup_state(State::California)?;
    println!("   California has {} records: {:?}", californians.len(),
        californians.iter().map(|k| k.as_str()).collect::<Vec<_>>());

    println!("\n4. Updating a record...");
    let moved = store.update(
        &RecordKey::new("123456789")?,
        RecordPatch::new().state(State::Texas),
    )?;
    println!("   {} moved to {}", moved.key, moved.state);
    println!(
        "   California now has {} records",
        store.lookup_state(State::California)?.len()
    );

    println!("\n5. Deleting a record...");
    let removed = store.delete(&RecordKey::new("987654321")?)?;
    println!("   Removed {}", removed.key);
    match store.get(&removed.key)? {
        Some(_) => println!("   Still present?!"),
        None => println!("   Confirmed gone"),
    }

    store.close()?;
    println!("\n=== Demo Complete ===");

    Ok(())
}
