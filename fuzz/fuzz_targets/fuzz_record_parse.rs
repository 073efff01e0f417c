#![no_main]

use censusdb_core::{Occupation, RecordKey, State};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        // Parsing arbitrary strings must fail cleanly, never panic
        let _ = RecordKey::new(text);
        let _ = text.parse::<State>();
        let _ = text.parse::<Occupation>();
    }
});
