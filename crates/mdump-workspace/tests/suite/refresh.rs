use mdump_core::{MethodEntry, SearchScope};
use mdump_workspace::Workspace;

use super::common::{config, indexed, names, write, BAZ, FOO};

#[test]
fn overloads_are_indexed_with_exact_bodies() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "src/demo/Foo.java", FOO);

    let workspace = indexed(dir.path());
    let methods = workspace.service().collect_methods(&SearchScope::Everything);
    assert_eq!(
        methods,
        vec![
            MethodEntry::new("bar", "{}"),
            MethodEntry::new("bar", "{\n        return x;\n    }"),
        ]
    );

    let stats = workspace.stats();
    assert_eq!(stats.files, 1);
    assert_eq!(stats.keys, 2);
}

#[test]
fn unchanged_files_are_not_reindexed_after_reopen() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "src/demo/Foo.java", FOO);
    write(dir.path(), "src/demo/util/Baz.java", BAZ);

    let first = indexed(dir.path());
    first.close().unwrap();

    let workspace = Workspace::open(dir.path(), &config()).unwrap();
    let report = workspace.refresh().unwrap();
    assert!(!report.full_rebuild);
    assert_eq!(report.files_scanned, 2);
    assert_eq!(report.files_scheduled, 0);
    assert_eq!(
        names(&workspace.service().collect_methods(&SearchScope::Everything)),
        vec!["alpha", "bar", "bar"]
    );
}

#[test]
fn edits_and_deletions_are_picked_up() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "src/demo/Foo.java", FOO);
    write(dir.path(), "src/demo/util/Baz.java", BAZ);
    let workspace = indexed(dir.path());

    write(
        dir.path(),
        "src/demo/Foo.java",
        "package demo;\nclass Foo { void zeta() {} }\n",
    );
    std::fs::remove_file(dir.path().join("src/demo/util/Baz.java")).unwrap();

    let report = workspace.refresh().unwrap();
    workspace.wait_until_indexed();
    assert_eq!(report.files_scheduled, 1);
    assert_eq!(report.files_removed, 1);
    assert_eq!(
        workspace.service().collect_methods(&SearchScope::Everything),
        vec![MethodEntry::new("zeta", "{}")]
    );
}

#[test]
fn rebuild_reindexes_every_file() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "src/demo/Foo.java", FOO);
    write(dir.path(), "src/demo/util/Baz.java", BAZ);
    let workspace = indexed(dir.path());

    workspace.request_rebuild().unwrap();
    assert_eq!(workspace.stats().files, 0);
    assert!(workspace
        .service()
        .collect_methods(&SearchScope::Everything)
        .is_empty());

    let report = workspace.refresh().unwrap();
    workspace.wait_until_indexed();
    assert!(report.full_rebuild);
    assert_eq!(report.files_scheduled, 2);
    assert_eq!(workspace.stats().files, 2);
}

#[test]
fn scope_limits_collected_methods() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "src/demo/Foo.java", FOO);
    write(dir.path(), "src/demo/util/Baz.java", BAZ);
    let workspace = indexed(dir.path());

    let util = workspace
        .service()
        .collect_methods(&SearchScope::directory("src/demo/util"));
    assert_eq!(names(&util), vec!["alpha"]);

    let foo_only = workspace
        .service()
        .collect_methods(&SearchScope::files(["src/demo/Foo.java"]));
    assert_eq!(names(&foo_only), vec!["bar", "bar"]);
}

#[test]
fn non_java_and_hidden_files_are_ignored() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "src/demo/Foo.java", FOO);
    write(dir.path(), "notes/Readme.md", "class Nope { void no() {} }");
    write(dir.path(), ".hidden/Secret.java", "class S { void hidden() {} }");

    let workspace = indexed(dir.path());
    let files: Vec<String> = workspace
        .java_files()
        .into_iter()
        .map(|(rel, _)| rel)
        .collect();
    assert_eq!(files, vec!["src/demo/Foo.java".to_string()]);
    assert_eq!(workspace.store().indexed_files(), files);
}

#[test]
fn opening_a_file_uses_its_directory_as_root() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "Foo.java", FOO);

    let workspace = Workspace::open(dir.path().join("Foo.java"), &config()).unwrap();
    assert_eq!(
        workspace.root(),
        std::fs::canonicalize(dir.path()).unwrap().as_path()
    );
}

#[test]
fn missing_root_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Workspace::open(dir.path().join("missing"), &config()).unwrap_err();
    assert!(err.to_string().contains("failed to read metadata"), "{err:#}");
}

fn record_path(workspace: &Workspace, rel: &str) -> std::path::PathBuf {
    workspace
        .store()
        .dir()
        .join(mdump_index::RECORDS_DIR_NAME)
        .join(mdump_index::record_file_name(rel))
}

#[test]
fn undecodable_entries_are_reextracted_on_next_refresh() {
    use mdump_index::{FileRecord, RECORD_SCHEMA_VERSION};
    use mdump_storage::{ArtifactKind, PersistedArchive, WriteCompression};

    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "src/demo/Foo.java", FOO);
    let workspace = indexed(dir.path());
    let record = record_path(&workspace, "src/demo/Foo.java");
    workspace.close().unwrap();

    // A well-formed record whose values no longer decode.
    let mut stored = PersistedArchive::<FileRecord>::open(
        &record,
        ArtifactKind::FileRecord,
        RECORD_SCHEMA_VERSION,
    )
    .unwrap()
    .to_owned()
    .unwrap();
    for entry in &mut stored.entries {
        entry.value = vec![0xff, 0xff];
    }
    mdump_storage::write_archive_atomic(
        &record,
        ArtifactKind::FileRecord,
        RECORD_SCHEMA_VERSION,
        &stored,
        WriteCompression::None,
    )
    .unwrap();

    let workspace = Workspace::open(dir.path(), &config()).unwrap();
    let report = workspace.refresh().unwrap();
    workspace.wait_until_indexed();
    assert_eq!(report.files_scheduled, 0);
    assert!(workspace
        .service()
        .collect_methods(&SearchScope::Everything)
        .is_empty());

    let report = workspace.refresh().unwrap();
    workspace.wait_until_indexed();
    assert_eq!(report.files_scheduled, 1);
    assert_eq!(
        names(&workspace.service().collect_methods(&SearchScope::Everything)),
        vec!["bar", "bar"]
    );
}

#[test]
fn record_with_corrupt_length_header_is_dropped_and_reindexed() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "src/demo/Foo.java", FOO);
    write(dir.path(), "src/demo/util/Baz.java", BAZ);
    let workspace = indexed(dir.path());
    let record = record_path(&workspace, "src/demo/Foo.java");
    workspace.close().unwrap();

    let mut bytes = std::fs::read(&record).unwrap();
    bytes[30] = 1;
    bytes[48..56].copy_from_slice(&(1u64 << 46).to_le_bytes());
    std::fs::write(&record, &bytes).unwrap();

    let workspace = Workspace::open(dir.path(), &config()).unwrap();
    assert_eq!(workspace.store().indexed_files(), vec!["src/demo/util/Baz.java"]);

    let report = workspace.refresh().unwrap();
    workspace.wait_until_indexed();
    assert_eq!(report.files_scheduled, 1);
    assert_eq!(
        names(&workspace.service().collect_methods(&SearchScope::Everything)),
        vec!["alpha", "bar", "bar"]
    );
}

#[cfg(unix)]
#[test]
fn symlink_loop_is_skipped_and_readiness_still_marked() {
    use mdump_core::IndexReadiness;

    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "src/demo/Foo.java", FOO);
    std::os::unix::fs::symlink(dir.path().join("src"), dir.path().join("src/loop")).unwrap();

    let workspace = Workspace::open(dir.path(), &config()).unwrap();
    let report = workspace.refresh().unwrap();
    assert!(workspace.scheduler().is_configured());
    workspace.scheduler().await_configured();
    workspace.wait_until_indexed();

    assert!(report.full_rebuild);
    assert_eq!(report.files_scanned, 1);
    assert_eq!(
        names(&workspace.service().collect_methods(&SearchScope::Everything)),
        vec!["bar", "bar"]
    );
}
