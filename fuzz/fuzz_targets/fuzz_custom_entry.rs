#![no_main]

use iconpack_engine::CustomIconEntry;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        // Every string parses; canonical output of a parsed entry is stable
        let entry = CustomIconEntry::parse(s);
        let canonical = entry.to_string();
        assert_eq!(CustomIconEntry::parse(&canonical).to_string(), canonical);
    }
});
