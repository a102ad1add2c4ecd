use serde::{Deserialize, Serialize};

/// One indexed method: its simple name and the exact source text of its body.
///
/// `body` includes the braces and whitespace exactly as written.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodEntry {
    pub name: String,
    pub body: String,
}

impl MethodEntry {
    pub fn new(name: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            body: body.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_field_order_is_name_then_body() {
        let entry = MethodEntry::new("testMethod", "public void test() {}");
        let json = serde_json::to_string(&entry).unwrap();
        assert_eq!(json, r#"{"name":"testMethod","body":"public void test() {}"}"#);
    }
}
