// Grammar for the trailing `KEY<sep>VALUE` words on the command line.
//
// | separator | meaning                 | verbs                    |
// |-----------|-------------------------|--------------------------|
// | `==`      | URL query parameter     | get, delete, patch, post |
// | `:=`      | JSON field of the body  | patch                    |
// | `=`       | form field of the body  | post                     |
//
// Every verb sees every word, so each rule rejects the words that belong
// to a different separator. A rejected word is dropped with a debug log and
// never fails the command. The one exception is a `:=` word whose value does
// not parse as JSON, which aborts the whole invocation.

use crate::error::LpError;
use anyhow::Result;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::debug;

/// One field of a POST body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FormField {
    Text { key: String, value: String },
    /// `key=@path`: upload the file at `path` under `key`.
    Attachment { key: String, path: PathBuf },
}

/// A key is usable when it is non-empty and carries no stray `=`.
fn valid_key(key: &str) -> bool {
    !key.is_empty() && !key.contains('=')
}

/// `key==value`. Dropped when there is no `==` or the key is not valid.
pub fn parse_query(word: &str) -> Option<(String, String)> {
    let (key, value) = word.split_once("==")?;
    valid_key(key).then(|| (key.to_string(), value.to_string()))
}

/// `key:=json`. `Ok(None)` means the word is not a JSON field; a JSON field
/// with an unparsable value is an error.
pub fn parse_json_field(word: &str) -> Result<Option<(String, Value)>> {
    let Some((key, raw)) = word.split_once(":=") else {
        return Ok(None);
    };
    if !valid_key(key) {
        return Ok(None);
    }
    let value: Value =
        serde_json::from_str(raw).map_err(|_| LpError::InvalidJson(raw.to_string()))?;
    Ok(Some((key.to_string(), value)))
}

/// `key=value` or `key=@path`. Dropped when there is no `=`, the key is empty
/// or ends with `:` (a JSON field), or the value is empty or starts with `=`
/// (a query parameter).
pub fn parse_form_field(word: &str) -> Option<FormField> {
    let (key, value) = word.split_once('=')?;
    if key.is_empty() || key.ends_with(':') || value.is_empty() || value.starts_with('=') {
        return None;
    }
    let key = key.to_string();
    if is_file_attachment(value) {
        Some(FormField::Attachment {
            key,
            path: PathBuf::from(extract_file_path(value)),
        })
    } else {
        Some(FormField::Text {
            key,
            value: value.to_string(),
        })
    }
}

pub fn query_params(words: &[String]) -> Vec<(String, String)> {
    collect(words, "query", parse_query)
}

pub fn form_fields(words: &[String]) -> Vec<FormField> {
    collect(words, "form", parse_form_field)
}

/// JSON object built from every `:=` word. Later keys overwrite earlier ones.
pub fn json_object(words: &[String]) -> Result<Map<String, Value>> {
    let mut object = Map::new();
    for word in words {
        match parse_json_field(word)? {
            Some((key, value)) => {
                object.insert(key, value);
            }
            None => debug!(word = %word, "not a json field, skipped"),
        }
    }
    Ok(object)
}

fn collect<T>(words: &[String], kind: &str, parse: impl Fn(&str) -> Option<T>) -> Vec<T> {
    words
        .iter()
        .filter_map(|word| {
            let parsed = parse(word);
            if parsed.is_none() {
                debug!(word = %word, "not a {} field, skipped", kind);
            }
            parsed
        })
        .collect()
}

pub fn is_file_attachment(value: &str) -> bool {
    value.starts_with('@')
}

/// Path part of an `@path` value, or `""` if the value is not an attachment.
pub fn extract_file_path(value: &str) -> &str {
    value.strip_prefix('@').unwrap_or("")
}

pub fn read_file_content(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|err| match err.kind() {
        std::io::ErrorKind::NotFound => LpError::FileNotFound(path.to_path_buf()).into(),
        _ => anyhow::Error::new(err).context(format!("Failed to read {}", path.display())),
    })
}

/// Content type for an upload, from the file extension.
pub fn detect_content_type(path: &Path) -> String {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        // Launchpad renders logs inline only when they are served as text.
        Some("log") => "text/plain".to_string(),
        Some("gz") | Some("tgz") => "application/gzip".to_string(),
        Some("yaml") | Some("yml") => "application/yaml".to_string(),
        Some(ext) => mime_guess::from_ext(ext)
            .first()
            .map(|mime| mime.essence_str().to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string()),
        None => "application/octet-stream".to_string(),
    }
}
