//! Structural wrapping of fragments.
//!
//! Upstream fragments often hold a bare set of definitions. Code generators
//! expect them under a named section, so the body is moved one level down:
//! `{a: 1}` wrapped with `components` becomes `{components: {a: 1}}`.
//! `serde_yaml::Mapping` keeps insertion order, so serialized keys keep their
//! relative order.

use std::path::Path;

use serde_yaml::{Mapping, Value};
use tokio::fs;

use crate::Error;

/// Nest `body` under a single `key`.
pub fn wrap(body: Value, key: &str) -> Value {
    let mut root = Mapping::with_capacity(1);
    root.insert(Value::String(key.to_string()), body);
    Value::Mapping(root)
}

/// Apply several wrappers, innermost first.
pub fn wrap_all<S: AsRef<str>>(body: Value, keys: &[S]) -> Value {
    keys.iter().fold(body, |acc, key| wrap(acc, key.as_ref()))
}

/// Parse fragment text as YAML (JSON is accepted as a subset).
pub fn parse_document(name: &str, text: &str) -> crate::Result<Value> {
    serde_yaml::from_str(text)
        .map_err(|e| Error::document(format!("Failed to parse {name} as YAML: {e}")))
}

/// Parse `text`, wrap it with `keys` and serialize it back.
///
/// Text is returned untouched when `keys` is empty.
pub fn wrap_text<S: AsRef<str>>(name: &str, text: &str, keys: &[S]) -> crate::Result<String> {
    if keys.is_empty() {
        return Ok(text.to_string());
    }
    let body = parse_document(name, text)?;
    Ok(serde_yaml::to_string(&wrap_all(body, keys))?)
}

/// Wrap a file on disk in place.
pub async fn wrap_file<P: AsRef<Path>, S: AsRef<str>>(path: P, keys: &[S]) -> crate::Result<()> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).await?;
    let wrapped = wrap_text(&path.display().to_string(), &text, keys)?;
    fs::write(path, wrapped).await?;
    Ok(())
}
