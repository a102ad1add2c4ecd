use mdump_core::{MethodEntry, SearchScope};
use mdump_index::{collect, MethodIndexStore, StoreOptions, RECORDS_DIR_NAME};

use super::common::{java_class, m};

#[test]
fn after_rebuild_only_re_extracted_files_are_visible() {
    let dir = tempfile::tempdir().unwrap();
    let store = MethodIndexStore::open(dir.path(), StoreOptions::default()).unwrap();
    store.take_rebuild_request();

    let a = java_class("A.java", "A", &[m("fromA", &[], "{a}", 0, 5)]);
    let b = java_class("B.java", "B", &[m("fromB", &[], "{b}", 0, 5)]);
    store.update_file(&a).unwrap();
    store.update_file(&b).unwrap();
    assert_eq!(collect(&store, &SearchScope::Everything).len(), 2);

    store.request_rebuild().unwrap();
    assert!(store.needs_full_rebuild());
    assert!(collect(&store, &SearchScope::Everything).is_empty());
    assert!(store.indexed_files().is_empty());
    let records = dir.path().join(RECORDS_DIR_NAME);
    assert_eq!(std::fs::read_dir(&records).unwrap().count(), 0);

    store.update_file(&a).unwrap();
    assert_eq!(
        collect(&store, &SearchScope::Everything),
        vec![MethodEntry::new("fromA", "{a}")]
    );
}

#[test]
fn rebuild_request_survives_until_taken() {
    let dir = tempfile::tempdir().unwrap();
    let store = MethodIndexStore::open(dir.path(), StoreOptions::default()).unwrap();
    assert!(store.take_rebuild_request());

    store.request_rebuild().unwrap();
    assert!(store.take_rebuild_request());
    assert!(!store.take_rebuild_request());
}
