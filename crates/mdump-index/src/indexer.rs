use std::panic::{self, AssertUnwindSafe};

use indexmap::IndexMap;
use mdump_core::{
    encode_method_key, walk_method, ContainerName, DeclarationVisitor, FileType, Language,
    MethodDecl, MethodEntry, SourceFile, TypeDecl,
};

/// Extracts every method with a body from a Java source file.
#[derive(Debug, Clone, Copy, Default)]
pub struct MethodIndexer;

impl MethodIndexer {
    pub const NAME: &'static str = "MethodFileBasedIndex";

    /// Bump whenever extraction output changes; persisted stores built by an
    /// older version are discarded.
    pub const VERSION: u32 = 1;

    /// Any content change to a matching file invalidates that file alone.
    pub fn depends_on_content(&self) -> bool {
        true
    }

    /// Per-file outputs are kept so unchanged files are never re-extracted.
    pub fn has_snapshot_mapping(&self) -> bool {
        true
    }

    pub fn applies_to<F: SourceFile + ?Sized>(&self, file: &F) -> bool {
        file.file_type() == FileType::Java && file.language() == Language::Java
    }

    /// Maps method keys to entries in visitation order.
    ///
    /// Non-matching files yield an empty map. Methods nested in a body (local
    /// and anonymous classes) come before the method that encloses them. A
    /// key produced twice keeps the later entry in the earlier position.
    ///
    /// Extraction never panics: a panic while walking the tree is logged and
    /// the file contributes nothing.
    pub fn extract<F: SourceFile + ?Sized>(&self, file: &F) -> IndexMap<String, MethodEntry> {
        if !self.applies_to(file) {
            return IndexMap::new();
        }

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            let mut collector = MethodCollector::default();
            for member in file.declarations() {
                collector.visit_member(None, member);
            }
            collector.entries
        }));

        match result {
            Ok(entries) => entries,
            Err(payload) => {
                tracing::warn!(
                    target: "mdump.index",
                    path = file.path(),
                    panic = %mdump_core::panic_payload_to_str(payload.as_ref()),
                    "method extraction panicked; file contributes no entries"
                );
                IndexMap::new()
            }
        }
    }
}

#[derive(Default)]
struct MethodCollector {
    entries: IndexMap<String, MethodEntry>,
}

impl DeclarationVisitor for MethodCollector {
    fn visit_method(&mut self, container: Option<&TypeDecl>, method: &MethodDecl) {
        walk_method(self, method);

        let Some(body) = &method.body else {
            return;
        };

        let container = match container {
            Some(ty) => ContainerName::for_type(ty.qualified_name.as_deref(), ty.name.as_deref()),
            None => ContainerName::NoClass,
        };
        let parameter_types: Vec<&str> = method
            .parameters
            .iter()
            .map(|param| param.type_text.as_str())
            .collect();
        let key = encode_method_key(container, &method.name, &parameter_types, method.range);

        let entry = MethodEntry::new(method.name.clone(), body.text.clone().unwrap_or_default());
        self.entries.insert(key, entry);
    }
}
