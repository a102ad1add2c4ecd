use std::path::Path;

use mdump_config::MdumpConfig;
use mdump_core::MethodEntry;
use mdump_workspace::Workspace;

pub const FOO: &str = "package demo;

public class Foo {
    public void bar() {}

    public int bar(int x) {
        return x;
    }
}
";

pub const BAZ: &str = "package demo.util;

class Baz {
    void alpha() { System.out.println(\"alpha\"); }
}
";

pub fn write(root: &Path, rel: &str, text: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, text).unwrap();
}

pub fn config() -> MdumpConfig {
    let mut config = MdumpConfig::default();
    config.index.threads = Some(2);
    config
}

/// Opens the workspace, runs one refresh and waits for indexing to finish.
pub fn indexed(root: &Path) -> Workspace {
    let workspace = Workspace::open(root, &config()).unwrap();
    workspace.refresh().unwrap();
    workspace.wait_until_indexed();
    workspace
}

pub fn names(methods: &[MethodEntry]) -> Vec<&str> {
    methods.iter().map(|m| m.name.as_str()).collect()
}
