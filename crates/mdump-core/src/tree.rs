//! Declaration trees supplied by the host environment.
//!
//! mdump never parses source text itself. A host hands over a [`SourceFile`]
//! whose declarations are already parsed into the owned node model below.

use serde::{Deserialize, Serialize};
use text_size::TextRange;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    Java,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    Java,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    Class,
    Interface,
    Enum,
    Record,
    Annotation,
    Anonymous,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDecl {
    pub kind: TypeKind,
    /// Simple name; `None` for anonymous types.
    pub name: Option<String>,
    /// Fully qualified name; `None` for local and anonymous types.
    pub qualified_name: Option<String>,
    pub range: Option<TextRange>,
    #[serde(default)]
    pub members: Vec<Member>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "member", rename_all = "snake_case")]
pub enum Member {
    Method(MethodDecl),
    Type(TypeDecl),
    /// Field initializers and initializer blocks; only the types declared
    /// inside them (local or anonymous) are tracked.
    Initializer { local_types: Vec<TypeDecl> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDecl {
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<ParamDecl>,
    /// `None` for abstract, interface, and native methods.
    pub body: Option<BodyDecl>,
    /// Range of the whole declaration.
    pub range: Option<TextRange>,
    #[serde(default)]
    pub is_constructor: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamDecl {
    pub name: String,
    /// Presentable type text as written, e.g. `List<String>` or `int...`.
    pub type_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BodyDecl {
    /// Exact source text including braces. Hosts may report no text.
    pub text: Option<String>,
    pub range: Option<TextRange>,
    /// Local and anonymous types declared inside the body.
    #[serde(default)]
    pub local_types: Vec<TypeDecl>,
}

/// A parsed source file handed to the engine by the host.
pub trait SourceFile {
    /// Project-relative, `/`-separated path.
    fn path(&self) -> &str;

    fn file_type(&self) -> FileType;

    fn language(&self) -> Language;

    /// Fingerprint of the file contents the tree was parsed from.
    fn content_hash(&self) -> &str;

    /// Top-level declarations in source order.
    fn declarations(&self) -> &[Member];
}

/// An owned [`SourceFile`], the form most hosts hand over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedFile {
    pub path: String,
    pub file_type: FileType,
    pub language: Language,
    pub content_hash: String,
    #[serde(default)]
    pub declarations: Vec<Member>,
}

impl SourceFile for ParsedFile {
    fn path(&self) -> &str {
        &self.path
    }

    fn file_type(&self) -> FileType {
        self.file_type
    }

    fn language(&self) -> Language {
        self.language
    }

    fn content_hash(&self) -> &str {
        &self.content_hash
    }

    fn declarations(&self) -> &[Member] {
        &self.declarations
    }
}

/// Depth-first traversal over a declaration tree.
///
/// Every method has a default implementation that keeps walking; override
/// the ones you care about and call the matching `walk_*` function to
/// continue into children.
pub trait DeclarationVisitor {
    fn visit_type(&mut self, ty: &TypeDecl) {
        walk_type(self, ty);
    }

    fn visit_member(&mut self, container: Option<&TypeDecl>, member: &Member) {
        walk_member(self, container, member);
    }

    fn visit_method(&mut self, _container: Option<&TypeDecl>, method: &MethodDecl) {
        walk_method(self, method);
    }
}

pub fn walk_type<V: DeclarationVisitor + ?Sized>(visitor: &mut V, ty: &TypeDecl) {
    for member in &ty.members {
        visitor.visit_member(Some(ty), member);
    }
}

pub fn walk_member<V: DeclarationVisitor + ?Sized>(
    visitor: &mut V,
    container: Option<&TypeDecl>,
    member: &Member,
) {
    match member {
        Member::Method(method) => visitor.visit_method(container, method),
        Member::Type(ty) => visitor.visit_type(ty),
        Member::Initializer { local_types } => {
            for ty in local_types {
                visitor.visit_type(ty);
            }
        }
    }
}

pub fn walk_method<V: DeclarationVisitor + ?Sized>(visitor: &mut V, method: &MethodDecl) {
    let Some(body) = &method.body else {
        return;
    };
    for ty in &body.local_types {
        visitor.visit_type(ty);
    }
}
