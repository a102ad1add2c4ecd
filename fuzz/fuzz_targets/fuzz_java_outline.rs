#![no_main]

use libfuzzer_sys::fuzz_target;
use mdump_index::MethodIndexer;
use mdump_workspace::java_outline;

const MAX_INPUT_SIZE: usize = 256 * 1024;

fuzz_target!(|data: &[u8]| {
    let data = &data[..data.len().min(MAX_INPUT_SIZE)];
    let text = String::from_utf8_lossy(data);

    let file = java_outline::parse_source_file("Fuzz.java", &text, String::new());
    let entries = MethodIndexer.extract(&file);

    // Bodies are slices of the input.
    for entry in entries.values() {
        assert!(text.contains(entry.body.as_str()));
    }
});
