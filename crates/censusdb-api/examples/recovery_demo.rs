//! Demonstrates durability across restarts.
//!
//! Committed operations survive a reopen; the startup replay clears the
//! previous session's WAL segments after confirming nothing was left
//! half-applied.
//!
//! Run with: cargo run -p censusdb --example recovery_demo

use censusdb::{Occupation, Record, RecordKey, State, Store, StoreConfig};
use std::path::Path;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let data_dir = "./demo_recovery_data";

    println!("=== CensusDB Recovery Demo ===\n");

    if Path::new(data_dir).exists() {
        std::fs::remove_dir_all(data_dir)?;
    }

    let config = StoreConfig {
        data_dir: data_dir.into(),
        ..Default::default()
    };

    println!("1. First session: creating records, then dropping the store");
    {
        let store = Store::open(config.clone())?;
        store.create(Record::new(
            RecordKey::new("111222333")?,
            State::Washington,
            Occupation::Doctor,
        ))?;
        store.create(Record::new(
            RecordKey::new("444555666")?,
            State::Montana,
            Occupation::Mechanic,
        ))?;
        // No clean close: the store simply goes out of scope
    }

    println!("2. Second session: replay runs before any request is served");
    {
        let store = Store::open(config)?;

        for raw in ["111222333", "444555666"] {
            let key = RecordKey::new(raw)?;
            match store.get(&key)? {
                Some(record) => println!("   {} recovered: {}, {}", key, record.state, record.occupation),
                None => println!("   {} missing!", key),
            }
        }

        let doctors = store.lookup_occupation(Occupation::Doctor)?;
        println!("   Doctor index has {} entries", doctors.len());

        store.close()?;
    }

    println!("\n=== Demo Complete ===");
    Ok(())
}
