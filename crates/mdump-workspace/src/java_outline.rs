//! A lightweight Java declaration outliner.
//!
//! This is not a Java parser. It tokenizes the source (skipping comments and
//! string, char and text-block literals) and recovers just the declaration
//! structure the method index needs: types (top-level, nested, local and
//! anonymous, including enum constant bodies), methods and constructors with
//! their parameters, bodies and byte ranges. Malformed input never panics; an
//! unterminated construct simply extends to the end of the file.
//!
//! Parameter types are rendered the way IDEs present them: annotations and
//! `final` are dropped, package qualifiers are dropped (`java.util.List<T>`
//! becomes `List<T>`), type arguments are separated by `, `, and array and
//! varargs suffixes are kept.
//!
//! A declaration's range starts at its Javadoc comment when one directly
//! precedes it, otherwise at its first modifier or annotation.

use mdump_core::{
    BodyDecl, FileType, Language, Member, MethodDecl, ParamDecl, ParsedFile, TextRange, TextSize,
    TypeDecl, TypeKind,
};

/// Builds the host-side view of one file.
///
/// Files without a `.java` extension are reported as [`FileType::Other`] with
/// no declarations.
pub fn parse_source_file(rel_path: &str, text: &str, content_hash: String) -> ParsedFile {
    let is_java = rel_path
        .rsplit('/')
        .next()
        .is_some_and(|name| name.ends_with(".java"));

    if !is_java {
        return ParsedFile {
            path: rel_path.to_string(),
            file_type: FileType::Other,
            language: Language::Other,
            content_hash,
            declarations: Vec::new(),
        };
    }

    ParsedFile {
        path: rel_path.to_string(),
        file_type: FileType::Java,
        language: Language::Java,
        content_hash,
        declarations: outline(text),
    }
}

/// Top-level declarations of a Java compilation unit.
pub fn outline(text: &str) -> Vec<Member> {
    Outliner::new(text).compilation_unit()
}

const MODIFIERS: &[&str] = &[
    "public",
    "protected",
    "private",
    "static",
    "final",
    "abstract",
    "native",
    "synchronized",
    "transient",
    "volatile",
    "strictfp",
    "default",
    "sealed",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tok {
    Ident,
    Literal,
    Ellipsis,
    Punct(char),
}

#[derive(Debug, Clone, Copy)]
struct Token {
    kind: Tok,
    start: u32,
    end: u32,
}

fn offset(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

fn is_ident_start(ch: char) -> bool {
    ch == '_' || ch == '$' || ch.is_alphabetic()
}

fn is_ident_continue(ch: char) -> bool {
    ch == '_' || ch == '$' || ch.is_alphanumeric()
}

struct Lexed {
    tokens: Vec<Token>,
    /// `/** ... */` spans, in source order.
    docs: Vec<(u32, u32)>,
}

fn lex(src: &str) -> Lexed {
    let bytes = src.as_bytes();
    let mut tokens = Vec::new();
    let mut docs = Vec::new();
    let mut i = 0usize;

    while i < bytes.len() {
        let b = bytes[i];

        if b.is_ascii_whitespace() {
            i += 1;
            continue;
        }

        if b == b'/' && bytes.get(i + 1) == Some(&b'/') {
            while i < bytes.len() && bytes[i] != b'\n' {
                i += 1;
            }
            continue;
        }

        if b == b'/' && bytes.get(i + 1) == Some(&b'*') {
            let start = i;
            let end = src[i + 2..]
                .find("*/")
                .map(|rel| i + 2 + rel + 2)
                .unwrap_or(bytes.len());
            if bytes.get(start + 2) == Some(&b'*') && end - start > 4 {
                docs.push((offset(start), offset(end)));
            }
            i = end;
            continue;
        }

        if src[i..].starts_with("\"\"\"") {
            let start = i;
            i += 3;
            loop {
                if i >= bytes.len() {
                    break;
                }
                if bytes[i] == b'\\' {
                    i += 2;
                    continue;
                }
                if bytes[i..].starts_with(b"\"\"\"") {
                    i += 3;
                    break;
                }
                i += 1;
            }
            let end = i.min(bytes.len());
            tokens.push(Token {
                kind: Tok::Literal,
                start: offset(start),
                end: offset(end),
            });
            i = end;
            continue;
        }

        if b == b'"' || b == b'\'' {
            let quote = b;
            let start = i;
            i += 1;
            while i < bytes.len() && bytes[i] != quote && bytes[i] != b'\n' {
                if bytes[i] == b'\\' {
                    i += 1;
                }
                i += 1;
            }
            if i < bytes.len() && bytes[i] == quote {
                i += 1;
            }
            let end = i.min(bytes.len());
            tokens.push(Token {
                kind: Tok::Literal,
                start: offset(start),
                end: offset(end),
            });
            i = end;
            continue;
        }

        if b.is_ascii_digit() || (b == b'.' && bytes.get(i + 1).is_some_and(u8::is_ascii_digit)) {
            let start = i;
            i += 1;
            while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || matches!(bytes[i], b'.' | b'_')) {
                i += 1;
            }
            tokens.push(Token {
                kind: Tok::Literal,
                start: offset(start),
                end: offset(i),
            });
            continue;
        }

        if src[i..].starts_with("...") {
            tokens.push(Token {
                kind: Tok::Ellipsis,
                start: offset(i),
                end: offset(i + 3),
            });
            i += 3;
            continue;
        }

        // `i` is always on a char boundary: every branch above advances over
        // ASCII bytes or whole literals.
        let Some(ch) = src[i..].chars().next() else {
            break;
        };
        let start = i;
        if is_ident_start(ch) {
            i += ch.len_utf8();
            while let Some(next) = src[i..].chars().next() {
                if !is_ident_continue(next) {
                    break;
                }
                i += next.len_utf8();
            }
            tokens.push(Token {
                kind: Tok::Ident,
                start: offset(start),
                end: offset(i),
            });
        } else {
            i += ch.len_utf8();
            tokens.push(Token {
                kind: Tok::Punct(ch),
                start: offset(start),
                end: offset(i),
            });
        }
    }

    Lexed { tokens, docs }
}

/// Where a code region ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stop {
    /// The `}` closing the current block.
    Brace,
    /// The `)` closing the current argument list.
    Paren,
    /// The `;` ending a field declaration.
    Semicolon,
}

struct Outliner<'a> {
    src: &'a str,
    tokens: Vec<Token>,
    docs: Vec<(u32, u32)>,
    package: Option<String>,
}

impl<'a> Outliner<'a> {
    fn new(src: &'a str) -> Self {
        let Lexed { tokens, docs } = lex(src);
        Self {
            src,
            tokens,
            docs,
            package: None,
        }
    }

    fn len(&self) -> usize {
        self.tokens.len()
    }

    fn kind(&self, i: usize) -> Option<Tok> {
        self.tokens.get(i).map(|token| token.kind)
    }

    fn text(&self, i: usize) -> &'a str {
        let src = self.src;
        self.tokens
            .get(i)
            .and_then(|token| src.get(token.start as usize..token.end as usize))
            .unwrap_or("")
    }

    fn is_punct(&self, i: usize, ch: char) -> bool {
        self.kind(i) == Some(Tok::Punct(ch))
    }

    fn is_ident(&self, i: usize) -> bool {
        self.kind(i) == Some(Tok::Ident)
    }

    fn is_word(&self, i: usize, word: &str) -> bool {
        self.is_ident(i) && self.text(i) == word
    }

    fn start_of(&self, i: usize) -> u32 {
        self.tokens
            .get(i)
            .map(|token| token.start)
            .unwrap_or(offset(self.src.len()))
    }

    fn end_of(&self, i: usize) -> u32 {
        self.tokens
            .get(i)
            .map(|token| token.end)
            .unwrap_or(offset(self.src.len()))
    }

    /// Start offset of a declaration whose first token is `i`, widened to a
    /// Javadoc comment sitting directly in front of it.
    fn decl_start(&self, i: usize) -> u32 {
        let token_start = self.start_of(i);
        let prev_end = if i == 0 { 0 } else { self.end_of(i - 1) };
        let idx = self.docs.partition_point(|&(start, _)| start < prev_end);
        self.docs[idx..]
            .iter()
            .take_while(|&&(_, end)| end <= token_start)
            .last()
            .map(|&(start, _)| start)
            .unwrap_or(token_start)
    }

    fn range(&self, start: u32, end: u32) -> Option<TextRange> {
        (start <= end).then(|| TextRange::new(TextSize::from(start), TextSize::from(end)))
    }

    /// Index just past the bracket matching the `open` at `i`.
    fn skip_balanced(&self, i: usize, open: char, close: char) -> usize {
        let mut depth = 0usize;
        let mut k = i;
        while k < self.len() {
            if self.is_punct(k, open) {
                depth += 1;
            } else if self.is_punct(k, close) {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return k + 1;
                }
            }
            k += 1;
        }
        self.len()
    }

    /// Index just past a `<...>` type parameter or argument list at `i`.
    fn skip_angles(&self, i: usize) -> usize {
        let mut depth = 0usize;
        let mut k = i;
        while k < self.len() {
            match self.kind(k) {
                Some(Tok::Punct('<')) => depth += 1,
                Some(Tok::Punct('>')) => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return k + 1;
                    }
                }
                Some(Tok::Punct('{' | '}' | ';' | '(' | ')')) => return k,
                _ => {}
            }
            k += 1;
        }
        self.len()
    }

    fn skip_annotation(&self, i: usize) -> usize {
        let mut k = i + 1;
        if self.is_ident(k) {
            k += 1;
        }
        while self.is_punct(k, '.') && self.is_ident(k + 1) {
            k += 2;
        }
        if self.is_punct(k, '(') {
            k = self.skip_balanced(k, '(', ')');
        }
        k
    }

    fn skip_modifiers(&self, i: usize) -> usize {
        let mut k = i;
        loop {
            if self.is_punct(k, '@') && !self.is_word(k + 1, "interface") {
                k = self.skip_annotation(k);
            } else if self.is_ident(k) && MODIFIERS.contains(&self.text(k)) {
                k += 1;
            } else if self.is_word(k, "non") && self.is_punct(k + 1, '-') && self.is_word(k + 2, "sealed")
            {
                k += 3;
            } else {
                return k;
            }
        }
    }

    /// Recognizes a type declaration keyword at `i`, returning the kind and
    /// the index of the type's name.
    fn type_keyword(&self, i: usize) -> Option<(TypeKind, usize)> {
        if self.is_punct(i, '@') && self.is_word(i + 1, "interface") {
            return Some((TypeKind::Annotation, i + 2));
        }
        if !self.is_ident(i) || !self.is_ident(i + 1) {
            return None;
        }
        let kind = match self.text(i) {
            "class" => TypeKind::Class,
            "interface" => TypeKind::Interface,
            "enum" => TypeKind::Enum,
            "record" if self.is_punct(i + 2, '(') || self.is_punct(i + 2, '<') => TypeKind::Record,
            _ => return None,
        };
        Some((kind, i + 1))
    }

    fn compilation_unit(&mut self) -> Vec<Member> {
        let mut i = self.skip_modifiers(0);
        if self.is_word(i, "package") {
            let mut name = String::new();
            i += 1;
            while i < self.len() && !self.is_punct(i, ';') {
                name.push_str(self.text(i));
                i += 1;
            }
            i += 1;
            if !name.is_empty() {
                self.package = Some(name);
            }
        } else {
            i = 0;
        }

        let mut members = Vec::new();
        while i < self.len() {
            if self.is_word(i, "import") {
                while i < self.len() && !self.is_punct(i, ';') {
                    i += 1;
                }
                i += 1;
                continue;
            }

            let start = i;
            let k = self.skip_modifiers(i);
            match self.type_keyword(k) {
                Some((kind, name_idx)) => {
                    let name = self.text(name_idx);
                    let qualified = match &self.package {
                        Some(package) => format!("{package}.{name}"),
                        None => name.to_string(),
                    };
                    let (ty, next) =
                        self.type_decl(kind, name_idx, self.decl_start(start), Some(qualified));
                    members.push(Member::Type(ty));
                    i = next;
                }
                None => i = k.max(i + 1),
            }
        }
        members
    }

    /// Parses the type whose name is at `name_idx`, returning it and the index
    /// after its closing brace.
    fn type_decl(
        &self,
        kind: TypeKind,
        name_idx: usize,
        start: u32,
        qualified_name: Option<String>,
    ) -> (TypeDecl, usize) {
        let name = self.text(name_idx).to_string();
        let mut i = name_idx + 1;
        let mut parens = 0usize;
        while i < self.len() {
            match self.kind(i) {
                Some(Tok::Punct('(')) => parens += 1,
                Some(Tok::Punct(')')) => parens = parens.saturating_sub(1),
                Some(Tok::Punct('{' | '}' | ';')) if parens == 0 => break,
                _ => {}
            }
            i += 1;
        }

        let mut ty = TypeDecl {
            kind,
            name: Some(name),
            qualified_name,
            range: None,
            members: Vec::new(),
        };

        if !self.is_punct(i, '{') {
            ty.range = self.range(start, self.end_of(i.saturating_sub(1)));
            return (ty, i.max(name_idx + 1));
        }

        let close = self.class_body(i, &mut ty);
        ty.range = self.range(start, self.end_of(close));
        (ty, close + 1)
    }

    /// Parses the members of the body opening at `open` into `ty`, returning
    /// the index of the closing brace.
    fn class_body(&self, open: usize, ty: &mut TypeDecl) -> usize {
        let mut i = open + 1;
        if ty.kind == TypeKind::Enum {
            i = self.enum_constants(i, &mut ty.members);
        }

        loop {
            if i >= self.len() || self.is_punct(i, '}') {
                return i;
            }
            if self.is_punct(i, ';') {
                i += 1;
                continue;
            }

            let start = i;
            let mut j = self.skip_modifiers(i);

            if self.is_punct(j, '{') {
                let (close, local_types) = self.code(j + 1, Stop::Brace);
                ty.members.push(Member::Initializer { local_types });
                i = close + 1;
                continue;
            }

            if let Some((kind, name_idx)) = self.type_keyword(j) {
                let qualified = ty
                    .qualified_name
                    .as_ref()
                    .map(|outer| format!("{outer}.{}", self.text(name_idx)));
                let (nested, next) =
                    self.type_decl(kind, name_idx, self.decl_start(start), qualified);
                ty.members.push(Member::Type(nested));
                i = next;
                continue;
            }

            if self.is_punct(j, '<') {
                j = self.skip_angles(j);
            }

            // Compact canonical constructor: `Name { ... }` inside a record.
            if ty.kind == TypeKind::Record
                && self.is_ident(j)
                && ty.name.as_deref() == Some(self.text(j))
                && self.is_punct(j + 1, '{')
            {
                let (method, next) = self.method(start, j, j + 1, true, Vec::new());
                ty.members.push(Member::Method(method));
                i = next;
                continue;
            }

            i = self.member(start, j, ty);
        }
    }

    /// Parses a field or method starting at `start` (declaration start) with
    /// its type or name at `j`. Returns the index after it.
    fn member(&self, start: usize, j: usize, ty: &mut TypeDecl) -> usize {
        let mut angles = 0usize;
        let mut k = j;
        while k < self.len() {
            match self.kind(k) {
                Some(Tok::Punct('<')) => angles += 1,
                Some(Tok::Punct('>')) => angles = angles.saturating_sub(1),
                Some(Tok::Punct('(')) if angles == 0 => {
                    if k == j || !self.is_ident(k - 1) {
                        return self.skip_balanced(k, '(', ')');
                    }
                    let name_idx = k - 1;
                    let is_constructor = name_idx == j;
                    let params_close = self.skip_balanced(k, '(', ')');
                    let parameters = self.parameters(k + 1, params_close.saturating_sub(1));
                    let (method, next) =
                        self.method(start, name_idx, params_close, is_constructor, parameters);
                    ty.members.push(Member::Method(method));
                    return next;
                }
                Some(Tok::Punct('=' | ';' | ',')) if angles == 0 => {
                    let (end, local_types) = self.code(k, Stop::Semicolon);
                    if !local_types.is_empty() {
                        ty.members.push(Member::Initializer { local_types });
                    }
                    return if self.is_punct(end, ';') { end + 1 } else { end };
                }
                Some(Tok::Punct('{')) => {
                    let (close, local_types) = self.code(k + 1, Stop::Brace);
                    ty.members.push(Member::Initializer { local_types });
                    return close + 1;
                }
                Some(Tok::Punct('}')) => return k,
                _ => {}
            }
            k += 1;
        }
        self.len()
    }

    /// Builds a method whose name is at `name_idx`; `after_params` is the
    /// index following the parameter list (or the body brace for compact
    /// constructors).
    fn method(
        &self,
        start: usize,
        name_idx: usize,
        after_params: usize,
        is_constructor: bool,
        parameters: Vec<ParamDecl>,
    ) -> (MethodDecl, usize) {
        let decl_start = self.decl_start(start);
        let mut k = after_params;
        let mut braces = 0usize;
        let mut body = None;
        let mut end_idx = k;

        while k < self.len() {
            match self.kind(k) {
                Some(Tok::Punct('{')) if braces == 0 && !self.in_default_value(after_params, k) => {
                    let (close, local_types) = self.code(k + 1, Stop::Brace);
                    let body_start = self.start_of(k);
                    let body_end = self.end_of(close);
                    body = Some(BodyDecl {
                        text: self
                            .src
                            .get(body_start as usize..body_end as usize)
                            .map(str::to_string),
                        range: self.range(body_start, body_end),
                        local_types,
                    });
                    end_idx = close;
                    break;
                }
                Some(Tok::Punct('{')) => braces += 1,
                Some(Tok::Punct('}')) if braces > 0 => braces -= 1,
                Some(Tok::Punct(';')) if braces == 0 => {
                    end_idx = k;
                    break;
                }
                Some(Tok::Punct('}')) => {
                    end_idx = k.saturating_sub(1);
                    let method = MethodDecl {
                        name: self.text(name_idx).to_string(),
                        parameters,
                        body: None,
                        range: self.range(decl_start, self.end_of(end_idx)),
                        is_constructor,
                    };
                    return (method, k);
                }
                _ => {}
            }
            end_idx = k;
            k += 1;
        }

        let method = MethodDecl {
            name: self.text(name_idx).to_string(),
            parameters,
            body,
            range: self.range(decl_start, self.end_of(end_idx)),
            is_constructor,
        };
        (method, (end_idx + 1).min(self.len()))
    }

    /// Whether the `{` at `k` belongs to an annotation element's `default`
    /// value rather than a method body.
    fn in_default_value(&self, from: usize, k: usize) -> bool {
        (from..k).any(|idx| self.is_word(idx, "default"))
    }

    fn parameters(&self, from: usize, close: usize) -> Vec<ParamDecl> {
        let mut params = Vec::new();
        let mut depth = 0usize;
        let mut segment_start = from;
        let mut k = from;
        while k <= close && k < self.len() {
            let at_end = k == close;
            match self.kind(k) {
                Some(Tok::Punct('<' | '(')) if !at_end => depth += 1,
                Some(Tok::Punct('>' | ')')) if !at_end => depth = depth.saturating_sub(1),
                _ => {}
            }
            if at_end || (depth == 0 && self.is_punct(k, ',')) {
                if let Some(param) = self.parameter(segment_start, k) {
                    params.push(param);
                }
                segment_start = k + 1;
            }
            k += 1;
        }
        params
    }

    fn parameter(&self, from: usize, to: usize) -> Option<ParamDecl> {
        let mut a = from;
        loop {
            if a >= to {
                return None;
            }
            if self.is_punct(a, '@') {
                a = self.skip_annotation(a);
            } else if self.is_word(a, "final") {
                a += 1;
            } else {
                break;
            }
        }

        let name_idx = (a..to).rev().find(|&idx| self.is_ident(idx))?;
        if name_idx == a {
            return None;
        }
        let name = self.text(name_idx);
        if name == "this" {
            return None;
        }

        let mut type_text = self.render_type(a, name_idx);
        let mut k = name_idx + 1;
        while k < to && self.is_punct(k, '[') && self.is_punct(k + 1, ']') {
            type_text.push_str("[]");
            k += 2;
        }

        Some(ParamDecl {
            name: name.to_string(),
            type_text,
        })
    }

    fn render_type(&self, from: usize, to: usize) -> String {
        let mut out = String::new();
        let mut k = from;
        while k < to {
            match self.kind(k) {
                Some(Tok::Punct('@')) => {
                    k = self.skip_annotation(k).min(to);
                    continue;
                }
                Some(Tok::Ident) => {
                    let word = self.text(k);
                    if self.is_punct(k + 1, '.') && self.is_ident(k + 2) && k + 2 < to {
                        k += 2;
                        continue;
                    }
                    match word {
                        "final" => {}
                        "extends" | "super" => {
                            out.push(' ');
                            out.push_str(word);
                            out.push(' ');
                        }
                        _ => {
                            if out.ends_with(|ch: char| is_ident_continue(ch)) {
                                out.push(' ');
                            }
                            out.push_str(word);
                        }
                    }
                }
                Some(Tok::Punct(',')) => out.push_str(", "),
                Some(Tok::Punct('&')) => out.push_str(" & "),
                Some(Tok::Ellipsis) => out.push_str("..."),
                Some(Tok::Punct(ch)) => out.push(ch),
                Some(Tok::Literal) => out.push_str(self.text(k)),
                None => break,
            }
            k += 1;
        }
        out
    }

    /// Parses enum constants up to the `;` or `}` ending them.
    fn enum_constants(&self, from: usize, members: &mut Vec<Member>) -> usize {
        let mut i = from;
        loop {
            i = self.skip_modifiers(i);
            match self.kind(i) {
                Some(Tok::Punct(';')) => return i + 1,
                Some(Tok::Punct(',')) => i += 1,
                Some(Tok::Ident) if !MODIFIERS.contains(&self.text(i)) => {
                    let constant = i;
                    let mut local_types = Vec::new();
                    i += 1;
                    if self.is_punct(i, '(') {
                        let (close, args) = self.code(i + 1, Stop::Paren);
                        local_types.extend(args);
                        i = close + 1;
                    }
                    if self.is_punct(i, '{') {
                        let mut anonymous = TypeDecl {
                            kind: TypeKind::Anonymous,
                            name: None,
                            qualified_name: None,
                            range: None,
                            members: Vec::new(),
                        };
                        let close = self.class_body(i, &mut anonymous);
                        anonymous.range = self.range(self.start_of(constant), self.end_of(close));
                        local_types.push(anonymous);
                        i = close + 1;
                    }
                    if !local_types.is_empty() {
                        members.push(Member::Initializer { local_types });
                    }
                }
                _ => return i,
            }
        }
    }

    /// Scans statements or expressions from `i` up to the terminator given by
    /// `stop`, collecting local and anonymous types in source order. Returns
    /// the terminator's index (or the token count when it is missing).
    fn code(&self, i: usize, stop: Stop) -> (usize, Vec<TypeDecl>) {
        let mut types = Vec::new();
        let mut braces = 0usize;
        let mut parens = 0usize;
        let mut k = i;

        while k < self.len() {
            match self.kind(k) {
                Some(Tok::Punct('{')) => braces += 1,
                Some(Tok::Punct('}')) => {
                    if braces == 0 {
                        return (k, types);
                    }
                    braces -= 1;
                }
                Some(Tok::Punct('(')) => parens += 1,
                Some(Tok::Punct(')')) => {
                    if parens == 0 && stop == Stop::Paren {
                        return (k, types);
                    }
                    parens = parens.saturating_sub(1);
                }
                Some(Tok::Punct(';')) if stop == Stop::Semicolon && braces == 0 && parens == 0 => {
                    return (k, types);
                }
                Some(Tok::Ident) if self.text(k) == "new" && !self.is_punct(k.wrapping_sub(1), ':') => {
                    k = self.creation(k, &mut types);
                    continue;
                }
                Some(Tok::Ident) if !self.is_punct(k.wrapping_sub(1), '.') => {
                    if let Some((kind, name_idx)) = self.type_keyword(k) {
                        let start = self.local_type_start(k);
                        let (local, next) = self.type_decl(kind, name_idx, start, None);
                        types.push(local);
                        k = next;
                        continue;
                    }
                }
                _ => {}
            }
            k += 1;
        }
        (self.len(), types)
    }

    /// Start of a local type declaration whose keyword is at `k`, including
    /// any modifiers and annotations in front of it.
    fn local_type_start(&self, k: usize) -> u32 {
        let mut first = k;
        while first > 0 {
            let prev = first - 1;
            if self.is_ident(prev) && MODIFIERS.contains(&self.text(prev)) {
                first = prev;
            } else {
                break;
            }
        }
        self.decl_start(first)
    }

    /// Handles `new T(...)`, `new T(...) { ... }` and `new T[...]` at `k`,
    /// returning the index to continue scanning from.
    fn creation(&self, k: usize, types: &mut Vec<TypeDecl>) -> usize {
        let type_start = k + 1;
        let mut i = type_start;
        loop {
            match self.kind(i) {
                Some(Tok::Punct('@')) => i = self.skip_annotation(i),
                Some(Tok::Ident) | Some(Tok::Punct('.')) => i += 1,
                Some(Tok::Punct('<')) => i = self.skip_angles(i),
                _ => break,
            }
        }

        if !self.is_punct(i, '(') {
            return i.max(k + 1);
        }

        let (close, args) = self.code(i + 1, Stop::Paren);
        types.extend(args);
        if !self.is_punct(close + 1, '{') {
            return close + 1;
        }

        let mut anonymous = TypeDecl {
            kind: TypeKind::Anonymous,
            name: None,
            qualified_name: None,
            range: None,
            members: Vec::new(),
        };
        let body_close = self.class_body(close + 1, &mut anonymous);
        anonymous.range = self.range(self.start_of(type_start), self.end_of(body_close));
        types.push(anonymous);
        body_close + 1
    }
}
