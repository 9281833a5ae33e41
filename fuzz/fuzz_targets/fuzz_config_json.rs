#![no_main]

use iconpack_engine::config::EngineConfig;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Arbitrary settings files must never panic the loader, and whatever
    // parses must serialize again
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(config) = serde_json::from_str::<EngineConfig>(s) {
            let _ = serde_json::to_string(&config);
        }
    }
});
