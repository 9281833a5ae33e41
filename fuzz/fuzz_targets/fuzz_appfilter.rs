#![no_main]

use iconpack_engine::pack::config_parser::parse_pack;
use iconpack_engine::platform::{MemoryResources, PackResources};
use libfuzzer_sys::fuzz_target;
use std::sync::Arc;

fuzz_target!(|data: &[u8]| {
    // Third-party appfilters are untrusted; parsing may fail but never panic
    if let Ok(s) = std::str::from_utf8(data) {
        let resources: Arc<dyn PackResources> = Arc::new(MemoryResources::new().with_xml("appfilter", s));
        let _ = parse_pack("com.fuzz", &resources);
    }
});
