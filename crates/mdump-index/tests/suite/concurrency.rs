use std::sync::atomic::{AtomicBool, Ordering};

use mdump_core::SearchScope;
use mdump_index::{collect, MethodIndexStore, StoreOptions};

use super::common::{java_class, m};

fn generation(n: usize) -> mdump_core::ParsedFile {
    let body = format!("{{ return {n}; }}");
    java_class(
        "Gen.java",
        "Gen",
        &[m("first", &[], &body, 0, 20), m("second", &[], &body, 30, 50)],
    )
}

#[test]
fn readers_never_see_half_of_a_file_update() {
    let dir = tempfile::tempdir().unwrap();
    let store = MethodIndexStore::open(dir.path(), StoreOptions::default()).unwrap();
    store.update_file(&generation(0)).unwrap();

    let done = AtomicBool::new(false);
    std::thread::scope(|scope| {
        scope.spawn(|| {
            for n in 1..200 {
                store.update_file(&generation(n)).unwrap();
            }
            done.store(true, Ordering::SeqCst);
        });

        let mut reads = 0usize;
        while !done.load(Ordering::SeqCst) || reads < 50 {
            let methods = collect(&store, &SearchScope::Everything);
            assert_eq!(methods.len(), 2, "{methods:?}");
            assert_eq!(methods[0].name, "first");
            assert_eq!(methods[1].name, "second");
            assert_eq!(methods[0].body, methods[1].body, "{methods:?}");
            reads += 1;
        }
    });

    assert_eq!(
        collect(&store, &SearchScope::Everything)[0].body,
        "{ return 199; }"
    );
}
