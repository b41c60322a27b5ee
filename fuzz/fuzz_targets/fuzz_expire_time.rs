// IDE: This is a cargo-fuzz target, not a normal module
// Run with: cargo fuzz run fuzz_expire_time
// Purpose: Find panics and hangs in the relative-time expression parser
#![no_main]

use chrono::Utc;
use clean_formidable_entries::domain::ExpireTime;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Convert raw bytes to string (fuzzer generates random bytes)
    if let Ok(s) = std::str::from_utf8(data) {
        // Ok/Err are both expected; we're looking for:
        // 1. Panics in the parser
        // 2. Overflow panics in the cutoff arithmetic
        if let Ok(expire_time) = ExpireTime::parse(s) {
            let _ = expire_time.cutoff_from(Utc::now());
        }
    }
});
