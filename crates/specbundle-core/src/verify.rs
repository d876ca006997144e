//! Reference checks for an assembled bundle.
//!
//! Every `$ref` string found in the bundle's files is resolved against the
//! bundle itself: the file part relative to the referencing file, the
//! fragment as a JSON pointer (`~1` for `/`, `~0` for `~`) inside that file.
//! Remote references are reported because the bundle should not depend on
//! anything outside it. Files are only read, never modified.

use std::collections::HashMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde_yaml::Value;
use tokio::fs;

/// Why a reference does not resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefProblem {
    /// Points to a remote location
    External,
    /// Referenced file does not exist
    MissingFile(PathBuf),
    /// Referenced file could not be parsed
    Unparsable(PathBuf),
    /// File exists but the pointer does not lead anywhere
    MissingTarget,
}

/// A `$ref` that does not resolve inside the bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedRef {
    pub file: PathBuf,
    pub reference: String,
    pub problem: RefProblem,
}

impl fmt::Display for UnresolvedRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match &self.problem {
            RefProblem::External => "points outside the bundle".to_string(),
            RefProblem::MissingFile(path) => format!("{} does not exist", path.display()),
            RefProblem::Unparsable(path) => format!("{} is not valid YAML", path.display()),
            RefProblem::MissingTarget => "pointer target not found".to_string(),
        };
        write!(f, "{}: {} ({})", self.file.display(), self.reference, reason)
    }
}

/// Check every `$ref` in `files`, paths relative to `bundle_dir`.
pub async fn verify_bundle<I, P>(bundle_dir: &Path, files: I) -> crate::Result<Vec<UnresolvedRef>>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let mut documents = DocumentCache::default();
    let mut unresolved = Vec::new();

    for relative in files {
        let file = normalize(&bundle_dir.join(relative.as_ref()));
        let Some(doc) = documents.load(&file).await?.cloned() else {
            return Err(crate::Error::document(format!(
                "Bundle file {} is not valid YAML",
                file.display()
            )));
        };

        let mut references = Vec::new();
        collect_refs(&doc, &mut references);
        for reference in references {
            if let Some(problem) = check_ref(&mut documents, &file, &doc, &reference).await? {
                let entry = UnresolvedRef {
                    file: file.clone(),
                    reference,
                    problem,
                };
                log::warn!("Unresolved reference {entry}");
                unresolved.push(entry);
            }
        }
    }

    Ok(unresolved)
}

async fn check_ref(
    documents: &mut DocumentCache,
    file: &Path,
    doc: &Value,
    reference: &str,
) -> crate::Result<Option<RefProblem>> {
    if reference.starts_with("http://") || reference.starts_with("https://") {
        return Ok(Some(RefProblem::External));
    }

    let (target_file, pointer) = match reference.split_once('#') {
        Some((target_file, pointer)) => (target_file, pointer),
        None => (reference, ""),
    };

    let target = if target_file.is_empty() {
        doc
    } else {
        let base = file.parent().unwrap_or_else(|| Path::new(""));
        let path = normalize(&base.join(target_file));
        if !fs::try_exists(&path).await? {
            return Ok(Some(RefProblem::MissingFile(path)));
        }
        match documents.load(&path).await? {
            Some(target) => target,
            None => return Ok(Some(RefProblem::Unparsable(path))),
        }
    };

    Ok(resolve_pointer(target, pointer)
        .is_none()
        .then_some(RefProblem::MissingTarget))
}

#[derive(Default)]
struct DocumentCache {
    documents: HashMap<PathBuf, Option<Value>>,
}

impl DocumentCache {
    /// Parsed document at `path`, `None` when it is not valid YAML.
    async fn load(&mut self, path: &Path) -> crate::Result<Option<&Value>> {
        if !self.documents.contains_key(path) {
            let text = fs::read_to_string(path).await?;
            let parsed = serde_yaml::from_str::<Value>(&text).ok();
            self.documents.insert(path.to_path_buf(), parsed);
        }
        Ok(self.documents.get(path).and_then(Option::as_ref))
    }
}

/// Gather every string `$ref` value in document order.
pub fn collect_refs(node: &Value, out: &mut Vec<String>) {
    match node {
        Value::Mapping(map) => {
            for (key, value) in map {
                match (key.as_str(), value) {
                    (Some("$ref"), Value::String(reference)) => out.push(reference.clone()),
                    _ => collect_refs(value, out),
                }
            }
        }
        Value::Sequence(items) => items.iter().for_each(|item| collect_refs(item, out)),
        Value::Tagged(tagged) => collect_refs(&tagged.value, out),
        _ => {}
    }
}

/// Follow a JSON pointer through a YAML document.
pub fn resolve_pointer<'a>(doc: &'a Value, pointer: &str) -> Option<&'a Value> {
    if pointer.is_empty() {
        return Some(doc);
    }
    pointer
        .strip_prefix('/')?
        .split('/')
        .map(|token| token.replace("~1", "/").replace("~0", "~"))
        .try_fold(doc, |node, token| match node {
            Value::Mapping(map) => map
                .iter()
                .find(|(key, _)| key_matches(key, &token))
                .map(|(_, value)| value),
            Value::Sequence(items) => token.parse::<usize>().ok().and_then(|i| items.get(i)),
            Value::Tagged(tagged) => resolve_pointer(&tagged.value, &format!("/{token}")),
            _ => None,
        })
}

fn key_matches(key: &Value, token: &str) -> bool {
    match key {
        Value::String(s) => s == token,
        Value::Number(n) => n.to_string() == token,
        Value::Bool(b) => b.to_string() == token,
        _ => false,
    }
}

/// Lexically drop `.` and fold `..` components.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
