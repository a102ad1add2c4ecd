use mdump_core::{IndexReadiness, MethodEntry};
use mdump_workspace::{run_startup_dump, DumpOutcome, DumpRequest, Workspace};

use super::common::{config, indexed, write, BAZ, FOO};

fn read_snapshot(path: &std::path::Path) -> Vec<MethodEntry> {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn dump_writes_sorted_snapshot_to_default_location() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "src/demo/Foo.java", FOO);
    write(dir.path(), "src/demo/util/Baz.java", BAZ);
    let workspace = indexed(dir.path());

    let service = workspace.service();
    let methods = service.collect_methods(&Default::default());
    let path = service.dump_methods_to_json(&methods, None).unwrap();

    assert_eq!(
        path,
        workspace.root().join(".mdump/method-dump/methods.json")
    );
    assert_eq!(
        read_snapshot(&path),
        vec![
            MethodEntry::new("alpha", "{ System.out.println(\"alpha\"); }"),
            MethodEntry::new("bar", "{}"),
            MethodEntry::new("bar", "{\n        return x;\n    }"),
        ]
    );
}

#[test]
fn repeated_dumps_are_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "src/demo/Foo.java", FOO);
    let workspace = indexed(dir.path());

    let service = workspace.service();
    let first = service
        .dump_methods_to_json(&service.collect_methods(&Default::default()), None)
        .unwrap();
    let before = std::fs::read(&first).unwrap();
    let second = service
        .dump_methods_to_json(&service.collect_methods(&Default::default()), None)
        .unwrap();
    assert_eq!(first, second);
    assert_eq!(std::fs::read(&second).unwrap(), before);
}

#[test]
fn configured_output_is_resolved_against_root() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "src/demo/Foo.java", FOO);
    let mut config = config();
    config.dump.output = Some("out/methods.json".into());

    let workspace = Workspace::open(dir.path(), &config).unwrap();
    workspace.refresh().unwrap();

    let outcome = run_startup_dump(
        workspace.scheduler(),
        workspace.service(),
        &DumpRequest::default(),
    );
    assert!(workspace.scheduler().is_ready());
    let expected = workspace.root().join("out/methods.json");
    assert_eq!(
        outcome,
        DumpOutcome::Written {
            path: expected.clone(),
            methods: 2
        }
    );
    assert_eq!(read_snapshot(&expected).len(), 2);
}

#[test]
fn empty_project_dumps_an_empty_array() {
    let dir = tempfile::tempdir().unwrap();
    let workspace = indexed(dir.path());
    let path = workspace.service().dump_methods_to_json(&[], None).unwrap();
    assert_eq!(std::fs::read_to_string(path).unwrap(), "[]");
}
