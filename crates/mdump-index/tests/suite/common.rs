use mdump_core::{
    BodyDecl, FileType, Language, Member, MethodDecl, ParamDecl, ParsedFile, TextRange, TextSize,
    TypeDecl, TypeKind,
};

pub struct M<'a> {
    pub name: &'a str,
    pub params: &'a [&'a str],
    pub body: Option<&'a str>,
    pub start: u32,
    pub end: u32,
}

pub fn m<'a>(name: &'a str, params: &'a [&'a str], body: &'a str, start: u32, end: u32) -> M<'a> {
    M {
        name,
        params,
        body: Some(body),
        start,
        end,
    }
}

pub fn java_class(path: &str, qualified: &str, methods: &[M<'_>]) -> ParsedFile {
    let simple = qualified.rsplit('.').next().unwrap_or(qualified);
    let members = methods
        .iter()
        .map(|method| {
            Member::Method(MethodDecl {
                name: method.name.to_string(),
                parameters: method
                    .params
                    .iter()
                    .enumerate()
                    .map(|(idx, ty)| ParamDecl {
                        name: format!("arg{idx}"),
                        type_text: ty.to_string(),
                    })
                    .collect(),
                body: method.body.map(|text| BodyDecl {
                    text: Some(text.to_string()),
                    range: None,
                    local_types: Vec::new(),
                }),
                range: Some(TextRange::new(
                    TextSize::from(method.start),
                    TextSize::from(method.end),
                )),
                is_constructor: false,
            })
        })
        .collect();

    let content_hash = methods
        .iter()
        .map(|method| format!("{}:{}", method.name, method.body.unwrap_or("-")))
        .collect::<Vec<_>>()
        .join("|");

    ParsedFile {
        path: path.to_string(),
        file_type: FileType::Java,
        language: Language::Java,
        content_hash,
        declarations: vec![Member::Type(TypeDecl {
            kind: TypeKind::Class,
            name: Some(simple.to_string()),
            qualified_name: Some(qualified.to_string()),
            range: None,
            members,
        })],
    }
}

pub fn names(entries: &[mdump_core::MethodEntry]) -> Vec<&str> {
    entries.iter().map(|entry| entry.name.as_str()).collect()
}
