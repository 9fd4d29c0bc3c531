#![no_main]

use libfuzzer_sys::fuzz_target;
use rpc_relay::protocol::decode;

fuzz_target!(|data: &[u8]| {
    // Decode + validate must never panic, and anything accepted must re-encode
    if let Ok(message) = decode(data) {
        let json = message.to_json().unwrap_or_default();
        assert!(decode(json.as_bytes()).is_ok());
    }
});
