use mdump_core::{MethodEntry, SearchScope};
use mdump_index::{
    collect, record_file_name, IndexError, MethodIndexStore, StoreOptions, RECORDS_DIR_NAME,
};
use mdump_storage::WriteCompression;

use super::common::{java_class, m, names};

#[test]
fn entries_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let file = java_class(
        "src/p/Foo.java",
        "p.Foo",
        &[m("bar", &["String", "int..."], "{\n  run();\n}", 30, 70)],
    );

    let store = MethodIndexStore::open(dir.path(), StoreOptions::default()).unwrap();
    store.update_file(&file).unwrap();
    let keys = store.all_keys();
    store.close().unwrap();

    let store = MethodIndexStore::open(dir.path(), StoreOptions::default()).unwrap();
    assert!(!store.needs_full_rebuild());
    assert_eq!(store.all_keys(), keys);
    assert_eq!(store.indexed_files(), vec!["src/p/Foo.java"]);
    assert!(store.is_up_to_date("src/p/Foo.java", &file.content_hash));
    assert_eq!(
        collect(&store, &SearchScope::Everything),
        vec![MethodEntry::new("bar", "{\n  run();\n}")]
    );
}

#[test]
fn compressed_records_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let options = StoreOptions {
        compression: WriteCompression::Auto { threshold: 0 },
        ..StoreOptions::default()
    };
    let body = format!("{{ {} }}", "x = x + 1;\n".repeat(500));

    let store = MethodIndexStore::open(dir.path(), options).unwrap();
    store
        .update_file(&java_class("Big.java", "Big", &[m("grow", &[], &body, 0, 9000)]))
        .unwrap();
    store.close().unwrap();

    let store = MethodIndexStore::open(dir.path(), options).unwrap();
    assert_eq!(
        collect(&store, &SearchScope::Everything),
        vec![MethodEntry::new("grow", body)]
    );
}

#[test]
fn indexer_version_bump_discards_everything() {
    let dir = tempfile::tempdir().unwrap();
    let store = MethodIndexStore::open(dir.path(), StoreOptions::default()).unwrap();
    store.take_rebuild_request();
    store
        .update_file(&java_class("A.java", "A", &[m("a", &[], "{}", 0, 2)]))
        .unwrap();
    store.close().unwrap();

    let bumped = StoreOptions {
        indexer_version: StoreOptions::default().indexer_version + 1,
        ..StoreOptions::default()
    };
    let store = MethodIndexStore::open(dir.path(), bumped).unwrap();
    assert!(store.needs_full_rebuild());
    assert!(store.indexed_files().is_empty());
    assert!(collect(&store, &SearchScope::Everything).is_empty());
}

#[test]
fn corrupt_metadata_discards_everything() {
    let dir = tempfile::tempdir().unwrap();
    let store = MethodIndexStore::open(dir.path(), StoreOptions::default()).unwrap();
    store
        .update_file(&java_class("A.java", "A", &[m("a", &[], "{}", 0, 2)]))
        .unwrap();
    store.close().unwrap();

    std::fs::write(dir.path().join("metadata.json"), b"{ not json").unwrap();

    let store = MethodIndexStore::open(dir.path(), StoreOptions::default()).unwrap();
    assert!(store.needs_full_rebuild());
    assert!(store.indexed_files().is_empty());
}

#[test]
fn corrupt_record_is_dropped_and_others_load() {
    let dir = tempfile::tempdir().unwrap();
    let store = MethodIndexStore::open(dir.path(), StoreOptions::default()).unwrap();
    store
        .update_file(&java_class("A.java", "A", &[m("keep", &[], "{}", 0, 2)]))
        .unwrap();
    store
        .update_file(&java_class("B.java", "B", &[m("lose", &[], "{}", 0, 2)]))
        .unwrap();
    store.close().unwrap();

    let records = dir.path().join(RECORDS_DIR_NAME);
    let broken = records.join(record_file_name("B.java"));
    let mut bytes = std::fs::read(&broken).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xff;
    std::fs::write(&broken, &bytes).unwrap();
    std::fs::write(records.join("A.java.rec.tmp.1.0"), b"partial").unwrap();

    let store = MethodIndexStore::open(dir.path(), StoreOptions::default()).unwrap();
    assert_eq!(store.indexed_files(), vec!["A.java"]);
    assert_eq!(names(&collect(&store, &SearchScope::Everything)), vec!["keep"]);
    assert!(!broken.exists());
    assert_eq!(std::fs::read_dir(&records).unwrap().count(), 1);
}

#[test]
fn second_open_of_same_dir_is_locked() {
    let dir = tempfile::tempdir().unwrap();
    let _store = MethodIndexStore::open(dir.path(), StoreOptions::default()).unwrap();
    let err = MethodIndexStore::open(dir.path(), StoreOptions::default()).unwrap_err();
    assert!(matches!(err, IndexError::Locked { .. }), "{err}");
}
