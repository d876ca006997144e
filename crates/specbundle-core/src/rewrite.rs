//! Literal reference rewriting.
//!
//! Rules are plain substring substitutions, no patterns. A list of rules is
//! applied left to right, each rule seeing the output of the previous one,
//! so the declared order is part of the meaning of a plan.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::fs;

/// One `(search, replace)` substitution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewriteRule {
    pub search: String,
    pub replace: String,
}

impl RewriteRule {
    pub fn new(search: impl Into<String>, replace: impl Into<String>) -> Self {
        Self {
            search: search.into(),
            replace: replace.into(),
        }
    }

    /// Apply this rule to `text`.
    pub fn apply(&self, text: &str) -> String {
        rewrite(text, &self.search, &self.replace)
    }
}

/// Replace every occurrence of `search` in `text` with `replace`.
///
/// An empty `search` leaves the text untouched instead of interleaving
/// `replace` between every character.
pub fn rewrite(text: &str, search: &str, replace: &str) -> String {
    if search.is_empty() {
        return text.to_string();
    }
    text.replace(search, replace)
}

/// Outcome of applying a list of rules.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteOutcome {
    pub text: String,
    /// Rules whose search string did not occur when their turn came
    pub unmatched: Vec<RewriteRule>,
}

/// Fold `rules` over `text` in declared order.
pub fn apply_rules(text: &str, rules: &[RewriteRule]) -> RewriteOutcome {
    let mut current = text.to_string();
    let mut unmatched = Vec::new();
    for rule in rules {
        if rule.search.is_empty() || !current.contains(&rule.search) {
            log::debug!("Rewrite rule matched nothing: {:?}", rule.search);
            unmatched.push(rule.clone());
            continue;
        }
        current = rule.apply(&current);
    }
    RewriteOutcome {
        text: current,
        unmatched,
    }
}

/// Rewrite a file in place: read it whole, apply `rules`, write it back.
///
/// The file is not touched when no rule matched.
pub async fn rewrite_file<P: AsRef<Path>>(
    path: P,
    rules: &[RewriteRule],
) -> crate::Result<RewriteOutcome> {
    let path = path.as_ref();
    let original = fs::read_to_string(path).await?;
    let outcome = apply_rules(&original, rules);
    if outcome.text != original {
        fs::write(path, &outcome.text).await?;
        log::debug!("Rewrote {}", path.display());
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_rewrite_schema_root() {
        let rules = [RewriteRule::new("#/schemas/", "#/components/schemas/")];
        let outcome = apply_rules("see #/schemas/Foo", &rules);
        assert_eq!(outcome.text, "see #/components/schemas/Foo");
        assert!(outcome.unmatched.is_empty());
    }

    #[test]
    fn test_rewrite_replaces_every_occurrence() {
        assert_eq!(
            rewrite("#/schemas/A #/schemas/B", "#/schemas/", "#/x/"),
            "#/x/A #/x/B"
        );
    }

    #[test]
    fn test_apply_rules_is_a_left_fold() {
        let text = "$ref: ../../../parameters/orgs.yaml#/OrgId\n$ref: '#/schemas/Foo'";
        let rules = vec![
            RewriteRule::new("../../../parameters/orgs.yaml#", "./parameters/orgs.yaml#/components/parameters"),
            RewriteRule::new("'#/schemas/", "'#/components/schemas/"),
            RewriteRule::new("Foo", "Bar"),
        ];
        let folded = rules.iter().fold(text.to_string(), |acc, r| r.apply(&acc));
        assert_eq!(apply_rules(text, &rules).text, folded);
    }

    #[test]
    fn test_rule_order_matters() {
        let text = "$ref: '#/schemas/Foo'";
        let widen = RewriteRule::new("#/schemas/", "#/components/schemas/");
        let retarget = RewriteRule::new("#/components/", "./common/common.yaml#/components/");

        let forward = apply_rules(text, &[widen.clone(), retarget.clone()]);
        let reversed = apply_rules(text, &[retarget, widen]);

        assert_eq!(
            forward.text,
            "$ref: './common/common.yaml#/components/schemas/Foo'"
        );
        assert_eq!(reversed.text, "$ref: '#/components/schemas/Foo'");
        assert_ne!(forward.text, reversed.text);
        assert_eq!(reversed.unmatched.len(), 1);
    }

    #[test]
    fn test_substring_search_matches_more_than_intended() {
        // "#/schemas" is also a prefix of "#/schemasExtra"
        let out = rewrite("#/schemas/A #/schemasExtra", "#/schemas", "#/components/schemas");
        assert_eq!(out, "#/components/schemas/A #/components/schemasExtra");
    }

    #[test]
    fn test_empty_search_is_noop() {
        assert_eq!(rewrite("abc", "", "x"), "abc");
        let outcome = apply_rules("abc", &[RewriteRule::new("", "x")]);
        assert_eq!(outcome.text, "abc");
        assert_eq!(outcome.unmatched.len(), 1);
    }

    #[tokio::test]
    async fn test_rewrite_file_absent_search_leaves_bytes_unchanged() -> crate::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("spec.yaml");
        let original = "openapi: 3.0.3\r\npaths: {}\r\n# trailing, no newline";
        tokio::fs::write(&path, original).await?;

        let outcome = rewrite_file(&path, &[RewriteRule::new("#/schemas/", "#/components/schemas/")]).await?;

        assert_eq!(tokio::fs::read(&path).await?, original.as_bytes());
        assert_eq!(outcome.unmatched.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_rewrite_file_in_place() -> crate::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("common.yaml");
        tokio::fs::write(&path, "a: {$ref: '#/headers/X'}\n").await?;

        rewrite_file(&path, &[RewriteRule::new("#/headers/", "#/components/headers/")]).await?;

        assert_eq!(
            tokio::fs::read_to_string(&path).await?,
            "a: {$ref: '#/components/headers/X'}\n"
        );
        Ok(())
    }
}
