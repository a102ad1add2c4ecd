#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Anything that decodes must encode back to the same bytes.
    if let Ok(entry) = mdump_storage::decode_entry(data) {
        let encoded = mdump_storage::encode_entry(&entry).expect("decoded entry must re-encode");
        assert_eq!(encoded, data);
    }
});
