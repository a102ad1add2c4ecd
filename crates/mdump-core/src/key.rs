//! Stable string keys identifying one method occurrence within a file.
//!
//! A key has the shape `{class}#{name}({T1,T2,...})@{disambiguator}`:
//! - `class` is the enclosing type's qualified name, falling back to its simple
//!   name, `<anonymous>`, or `<no-class>` when there is no enclosing type;
//! - the parameter list uses each parameter's presentable type text in
//!   declaration order (no semantic resolution);
//! - the disambiguator mixes the method's source range offsets so overloads
//!   with identical signatures in one file still get distinct keys.
//!
//! Keys are only unique within a single file's extraction pass. The index maps
//! each key back to the files that produced it.
//!
//! ## Known limitation
//! The disambiguator is collision-*reducing*, not collision-proof: it is
//! computed with 32-bit wrapping arithmetic, so two different ranges can map
//! to the same value, and `i32::MIN` survives the absolute value as a negative
//! number. Extraction resolves such clashes last-write-wins.

use std::fmt::Write as _;

use text_size::TextRange;

pub const ANONYMOUS_CLASS_MARKER: &str = "<anonymous>";
pub const NO_CLASS_MARKER: &str = "<no-class>";

/// The enclosing-type component of a method key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerName<'a> {
    Qualified(&'a str),
    Simple(&'a str),
    Anonymous,
    NoClass,
}

impl<'a> ContainerName<'a> {
    /// Picks the best available name for an enclosing type.
    pub fn for_type(qualified_name: Option<&'a str>, name: Option<&'a str>) -> Self {
        match (qualified_name, name) {
            (Some(qualified), _) => Self::Qualified(qualified),
            (None, Some(name)) => Self::Simple(name),
            (None, None) => Self::Anonymous,
        }
    }

    pub fn as_str(&self) -> &'a str {
        match *self {
            Self::Qualified(name) | Self::Simple(name) => name,
            Self::Anonymous => ANONYMOUS_CLASS_MARKER,
            Self::NoClass => NO_CLASS_MARKER,
        }
    }
}

/// `abs((start * 31 + end) * 31)` evaluated with 32-bit wrapping semantics.
///
/// Offsets beyond `i32::MAX` wrap when reinterpreted, matching 32-bit integer
/// offsets.
#[inline]
pub fn range_disambiguator(start: u32, end: u32) -> i32 {
    let start = start as i32;
    let end = end as i32;
    start
        .wrapping_mul(31)
        .wrapping_add(end)
        .wrapping_mul(31)
        .wrapping_abs()
}

/// Encodes the key of a method declaration.
///
/// A method without a source range gets a disambiguator of `0`.
pub fn encode_method_key<S: AsRef<str>>(
    container: ContainerName<'_>,
    name: &str,
    parameter_types: &[S],
    range: Option<TextRange>,
) -> String {
    let disambiguator = range
        .map(|range| range_disambiguator(range.start().into(), range.end().into()))
        .unwrap_or(0);

    let mut key = String::with_capacity(container.as_str().len() + name.len() + 16);
    key.push_str(container.as_str());
    key.push('#');
    key.push_str(name);
    key.push('(');
    for (idx, ty) in parameter_types.iter().enumerate() {
        if idx > 0 {
            key.push(',');
        }
        key.push_str(ty.as_ref());
    }
    key.push(')');
    key.push('@');
    let _ = write!(key, "{disambiguator}");
    key
}
