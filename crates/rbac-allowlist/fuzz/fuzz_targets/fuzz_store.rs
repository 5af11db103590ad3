//! Fuzz target for exception store loading.
//!
//! Arbitrary bytes in the store file must produce an error or a valid store,
//! never a panic.

#![no_main]

use libfuzzer_sys::fuzz_target;
use rbac_allowlist::ExceptionStore;
use std::io::Write;

fuzz_target!(|data: &[u8]| {
    if data.len() > 100_000 {
        return;
    }

    if let Ok(mut temp_file) = tempfile::NamedTempFile::new() {
        if temp_file.write_all(data).is_ok() {
            if let Ok(store) = ExceptionStore::open(temp_file.path()) {
                for record in store.records() {
                    let _ = record.rule.signature();
                }
            }
        }
    }
});
