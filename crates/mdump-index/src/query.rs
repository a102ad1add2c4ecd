use mdump_core::{MethodEntry, SearchScope};

use crate::store::MethodIndexStore;

/// Collects every entry produced by files in `scope`, sorted by name.
///
/// Runs inside one read scope of the store. Keys are visited in ascending
/// order and, per key, files in ascending path order; equal names keep that
/// encounter order (the sort is stable). Keys with no file in scope are
/// skipped before any value is decoded.
pub fn collect(store: &MethodIndexStore, scope: &SearchScope) -> Vec<MethodEntry> {
    let view = store.read();

    let mut keys_in_scope = 0usize;
    let mut methods = Vec::new();
    for key in view.all_keys() {
        if view.files_containing(key, scope).is_empty() {
            continue;
        }
        keys_in_scope += 1;
        methods.extend(view.values_for(key, scope));
    }
    drop(view);

    methods.sort_by(|a, b| a.name.cmp(&b.name));

    tracing::debug!(
        target: "mdump.index",
        keys = keys_in_scope,
        methods = methods.len(),
        "collected methods"
    );
    methods
}
