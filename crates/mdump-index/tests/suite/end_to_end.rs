use mdump_core::{MethodEntry, SearchScope};
use mdump_index::{collect, MethodIndexStore, MethodIndexer, StoreOptions};

use super::common::{java_class, m};

#[test]
fn overloaded_methods_are_indexed_and_collected_in_encounter_order() {
    let dir = tempfile::tempdir().unwrap();
    let store = MethodIndexStore::open(dir.path(), StoreOptions::default()).unwrap();

    let file = java_class(
        "src/Foo.java",
        "Foo",
        &[
            m("bar", &[], "{}", 17, 36),
            m("bar", &["int"], "{ return; }", 42, 73),
        ],
    );

    let extracted = MethodIndexer.extract(&file);
    let keys: Vec<&String> = extracted.keys().collect();
    assert_eq!(keys.len(), 2);
    assert!(keys[0].starts_with("Foo#bar()@"), "{}", keys[0]);
    assert!(keys[1].starts_with("Foo#bar(int)@"), "{}", keys[1]);
    let disambiguator = |key: &str| key.rsplit('@').next().unwrap().parse::<i32>().unwrap();
    assert_ne!(disambiguator(keys[0]), disambiguator(keys[1]));

    assert_eq!(store.update_file(&file).unwrap(), 2);

    let methods = collect(&store, &SearchScope::directory("src"));
    assert_eq!(
        methods,
        vec![
            MethodEntry::new("bar", "{}"),
            MethodEntry::new("bar", "{ return; }"),
        ]
    );
}

#[test]
fn collect_is_a_fresh_snapshot_each_call() {
    let dir = tempfile::tempdir().unwrap();
    let store = MethodIndexStore::open(dir.path(), StoreOptions::default()).unwrap();

    store
        .update_file(&java_class("A.java", "A", &[m("alpha", &[], "{}", 0, 5)]))
        .unwrap();
    let first = collect(&store, &SearchScope::Everything);

    store
        .update_file(&java_class("A.java", "A", &[m("beta", &[], "{}", 0, 5)]))
        .unwrap();
    let second = collect(&store, &SearchScope::Everything);

    assert_eq!(first, vec![MethodEntry::new("alpha", "{}")]);
    assert_eq!(second, vec![MethodEntry::new("beta", "{}")]);
}
