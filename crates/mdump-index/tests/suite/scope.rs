use mdump_core::{MethodEntry, SearchScope};
use mdump_index::{collect, MethodIndexStore, StoreOptions};

use super::common::{java_class, m, names};

#[test]
fn entries_are_sorted_by_name() {
    let dir = tempfile::tempdir().unwrap();
    let store = MethodIndexStore::open(dir.path(), StoreOptions::default()).unwrap();

    store
        .update_file(&java_class(
            "Sort.java",
            "Sort",
            &[
                m("b", &[], "{b}", 0, 10),
                m("a", &[], "{a}", 20, 30),
                m("c", &[], "{c}", 40, 50),
            ],
        ))
        .unwrap();

    let methods = collect(&store, &SearchScope::Everything);
    assert_eq!(names(&methods), vec!["a", "b", "c"]);
}

#[test]
fn equal_names_keep_key_then_path_order() {
    let dir = tempfile::tempdir().unwrap();
    let store = MethodIndexStore::open(dir.path(), StoreOptions::default()).unwrap();

    // Same key in two files: ordered by path.
    store
        .update_file(&java_class("b/Same.java", "Same", &[m("run", &[], "{b}", 0, 10)]))
        .unwrap();
    store
        .update_file(&java_class("a/Same.java", "Same", &[m("run", &[], "{a}", 0, 10)]))
        .unwrap();
    // `Other#run()@...` sorts before `Same#run()@...`.
    store
        .update_file(&java_class("c/Other.java", "Other", &[m("run", &[], "{c}", 0, 10)]))
        .unwrap();

    let methods = collect(&store, &SearchScope::Everything);
    assert_eq!(
        methods,
        vec![
            MethodEntry::new("run", "{c}"),
            MethodEntry::new("run", "{a}"),
            MethodEntry::new("run", "{b}"),
        ]
    );
}

#[test]
fn files_outside_scope_never_contribute() {
    let dir = tempfile::tempdir().unwrap();
    let store = MethodIndexStore::open(dir.path(), StoreOptions::default()).unwrap();

    store
        .update_file(&java_class("main/A.java", "A", &[m("inside", &[], "{}", 0, 5)]))
        .unwrap();
    store
        .update_file(&java_class("test/B.java", "B", &[m("outside", &[], "{}", 0, 5)]))
        .unwrap();

    let in_main = collect(&store, &SearchScope::directory("main"));
    assert_eq!(names(&in_main), vec!["inside"]);

    let explicit = collect(&store, &SearchScope::files(["test/B.java"]));
    assert_eq!(names(&explicit), vec!["outside"]);

    assert!(collect(&store, &SearchScope::files(Vec::<String>::new())).is_empty());
}
