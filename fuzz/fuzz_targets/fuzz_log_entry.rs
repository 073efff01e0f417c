#![no_main]

use censusdb_wal::LogEntry;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Limit input size to prevent timeout
    if data.len() > 1_000_000 {
        return;
    }

    // Try to decode a WAL frame - should never panic
    let _ = LogEntry::decode(data);
});
