//! Fuzz target for dataset loading.
//!
//! This fuzzer tests that the CSV/TSV parser and column mapping:
//! 1. Never panic on malformed input
//! 2. Handle all delimiter combinations

#![no_main]

use libfuzzer_sys::fuzz_target;
use rbac_allowlist::Dataset;
use std::io::Write;

fuzz_target!(|data: &[u8]| {
    if data.len() > 100_000 {
        return;
    }

    if let Ok(mut temp_file) = tempfile::NamedTempFile::new() {
        if temp_file.write_all(data).is_ok() {
            let _ = Dataset::load(temp_file.path());
        }
    }
});
