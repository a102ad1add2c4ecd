#![no_main]

use libfuzzer_sys::fuzz_target;
use mdump_index::{
    MethodIndexStore, MethodIndexer, StoreMetadata, StoreOptions, METADATA_FILE_NAME,
    RECORDS_DIR_NAME,
};

fuzz_target!(|data: &[u8]| {
    let dir = tempfile::tempdir().expect("failed to create tempdir");
    StoreMetadata::new(MethodIndexer::NAME, MethodIndexer::VERSION)
        .save(&dir.path().join(METADATA_FILE_NAME))
        .expect("failed to write metadata");

    let records = dir.path().join(RECORDS_DIR_NAME);
    std::fs::create_dir_all(&records).expect("failed to create records dir");
    let cap = data.len().min(64 * 1024);
    std::fs::write(records.join("fuzz.rec"), &data[..cap]).expect("failed to write record");

    // Corrupt records are dropped on open; they must never panic.
    if let Ok(store) = MethodIndexStore::open(dir.path(), StoreOptions::default()) {
        for key in store.all_keys() {
            let _ = store.values_for(&key, &Default::default());
        }
    }
});
