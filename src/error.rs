// Error types that callers need to tell apart. Everything else travels as a
// plain `anyhow::Error` with context attached at the call site.

use reqwest::StatusCode;
use std::path::PathBuf;
use thiserror::Error;

/// Failures with a fixed meaning for the CLI. They are returned wrapped in
/// `anyhow::Error`; use `downcast_ref::<LpError>()` to inspect them.
#[derive(Debug, Error)]
pub enum LpError {
    /// Non-2xx response. `hint` is set for expired tokens.
    #[error("{}", render_http(.status, .body, .hint))]
    Http {
        status: StatusCode,
        body: String,
        hint: Option<String>,
    },

    /// The user declined the request token on the authorize page.
    #[error("{0}")]
    Refused(String),

    /// A `key:=value` word whose value is not JSON.
    #[error("Invalid JSON input: {0}")]
    InvalidJson(String),

    /// A PUT body file that is not JSON.
    #[error("Invalid JSON file: {}", .0.display())]
    InvalidJsonFile(PathBuf),

    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// An OAuth token response without the named field.
    #[error("missing '{0}' in token response")]
    MissingField(&'static str),

    #[error("There is no such '{0}' key.")]
    NoSuchKey(String),

    #[error("The value of '{0}' key is not string.")]
    NotString(String),
}

fn render_http(status: &StatusCode, body: &str, hint: &Option<String>) -> String {
    let reason = status.canonical_reason().unwrap_or("");
    match hint {
        Some(hint) => format!("{} {}\n{}\n{}", status.as_u16(), reason, body, hint),
        None => format!("{} {}\n{}", status.as_u16(), reason, body),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_error_renders_status_line_and_body() {
        let err = LpError::Http {
            status: StatusCode::NOT_FOUND,
            body: "Object: <Bug>, name: 'x'".into(),
            hint: None,
        };
        assert_eq!(err.to_string(), "404 Not Found\nObject: <Bug>, name: 'x'");
    }

    #[test]
    fn http_error_appends_hint() {
        let err = LpError::Http {
            status: StatusCode::UNAUTHORIZED,
            body: "Expired token (abc).".into(),
            hint: Some("Please remove /tmp/lp.toml if it exists and try it again.".into()),
        };
        let text = err.to_string();
        assert!(text.starts_with("401 Unauthorized\nExpired token"));
        assert!(text.ends_with("try it again."));
    }
}
