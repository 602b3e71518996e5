#![no_main]
use libfuzzer_sys::fuzz_target;
use tenura_core::config::SizingConfig;

fuzz_target!(|data: &[u8]| {
    // Try to parse arbitrary bytes as a JSON sizing config; anything that
    // parses must also survive validation without panicking.
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(config) = serde_json::from_str::<SizingConfig>(s) {
            let _ = config.validate();
        }
    }
});
