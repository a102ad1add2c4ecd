use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, IndexError>;

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage error: {0}")]
    Storage(#[from] mdump_storage::StorageError),

    #[error("json error: {message}")]
    Json { message: String },

    #[error("index store at {path} is already open")]
    Locked { path: PathBuf },
}

impl From<serde_json::Error> for IndexError {
    fn from(err: serde_json::Error) -> Self {
        // Store metadata carries user paths; keep quoted values out of error text.
        Self::Json {
            message: redact_quoted(&err.to_string()),
        }
    }
}

fn redact_quoted(message: &str) -> String {
    let mut out = String::with_capacity(message.len());
    let mut inside = false;
    let mut escaped = false;
    for ch in message.chars() {
        if inside {
            match ch {
                '\\' if !escaped => escaped = true,
                '"' if !escaped => {
                    inside = false;
                    out.push_str("<redacted>\"");
                }
                _ => escaped = false,
            }
            continue;
        }
        out.push(ch);
        if ch == '"' {
            inside = true;
        }
    }
    if inside {
        out.push_str("<redacted>");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_errors_do_not_echo_string_values() {
        let err = serde_json::from_value::<bool>(serde_json::json!("src/secret/Path.java"))
            .expect_err("type error");
        let message = IndexError::from(err).to_string();
        assert!(!message.contains("secret"), "{message}");
        assert!(message.contains("<redacted>"), "{message}");
    }
}
