//! Core shared types for mdump.
//!
//! This crate is intentionally small and free of I/O: the method entry model,
//! the stable method key scheme, the host-supplied declaration tree, search
//! scopes, and the readiness capability the engine waits on.

mod entry;
mod key;
mod ready;
mod scope;
mod tree;

pub use entry::MethodEntry;
pub use key::{encode_method_key, range_disambiguator, ContainerName};
pub use ready::{AlwaysReady, IndexReadiness};
pub use scope::{normalize_rel_path, SearchScope};
pub use text_size::{TextRange, TextSize};
pub use tree::{
    walk_member, walk_method, walk_type, BodyDecl, DeclarationVisitor, FileType, Language, Member,
    MethodDecl, ParamDecl, ParsedFile, SourceFile, TypeDecl, TypeKind,
};

/// Version of the running mdump build.
///
/// Persisted artifacts record it and are discarded when it changes.
pub const MDUMP_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Endian {
    Little = 0,
    Big = 1,
}

impl Endian {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Little),
            1 => Some(Self::Big),
            _ => None,
        }
    }
}

#[inline]
pub const fn target_endian() -> Endian {
    if cfg!(target_endian = "little") {
        Endian::Little
    } else {
        Endian::Big
    }
}

#[inline]
pub const fn target_pointer_width() -> u8 {
    (std::mem::size_of::<usize>() * 8) as u8
}

/// Best-effort conversion of a panic payload into a message.
pub fn panic_payload_to_str(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        return message;
    }
    if let Some(message) = payload.downcast_ref::<String>() {
        return message.as_str();
    }
    "<non-string panic payload>"
}
