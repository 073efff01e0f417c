#![no_main]

use censusdb_storage::{BucketSnapshot, IndexSnapshot};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Limit input size to prevent timeout
    if data.len() > 1_000_000 {
        return;
    }

    // Both on-disk snapshot decoders must reject garbage without panicking
    let _ = BucketSnapshot::decode(data);
    let _ = IndexSnapshot::decode(data);
});
