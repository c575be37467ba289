//! Domain types for the Folio content editor and publish pipeline.
//!
//! Content maps are `BTreeMap`-backed so serialising equal content always
//! yields identical text; the change tracker relies on that.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Name of one content document, e.g. `profile` or `blog-hello-world`.
///
/// Maps onto a file stem inside the content directory.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentName(pub String);

impl DocumentName {
    /// A name is usable as a file stem: non-empty, no separators, no dot-prefix.
    pub fn is_valid(&self) -> bool {
        let name = self.0.as_str();
        !name.is_empty()
            && !name.starts_with('.')
            && !name.contains(['/', '\\'])
            && !name.contains("..")
    }
}

impl fmt::Display for DocumentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for DocumentName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for DocumentName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Short commit hash as printed by `git rev-parse --short HEAD`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommitHash(pub String);

impl CommitHash {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommitHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for CommitHash {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for CommitHash {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ---------------------------------------------------------------------------
// Content model
// ---------------------------------------------------------------------------

/// One editable document: structured JSON data or a Markdown post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "body", rename_all = "lowercase")]
pub enum Document {
    Json(Value),
    Markdown(String),
}

impl Document {
    /// File extension used by the flat-file store.
    pub fn extension(&self) -> &'static str {
        match self {
            Document::Json(_) => "json",
            Document::Markdown(_) => "md",
        }
    }

    /// Extension the same name would have as the other document kind.
    pub fn other_extension(&self) -> &'static str {
        match self {
            Document::Json(_) => "md",
            Document::Markdown(_) => "json",
        }
    }
}

/// The full editable state of the site.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SiteContent {
    #[serde(default)]
    pub documents: BTreeMap<DocumentName, Document>,
}

impl SiteContent {
    pub fn get(&self, name: &DocumentName) -> Option<&Document> {
        self.documents.get(name)
    }

    /// Insert or replace a document, returning the previous version.
    pub fn set(&mut self, name: DocumentName, document: Document) -> Option<Document> {
        self.documents.insert(name, document)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Publish result
// ---------------------------------------------------------------------------

/// Sentinel reported when the working tree had nothing to commit.
pub const NO_CHANGES: &str = "no-changes";

/// Outcome of one publish sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitResult {
    /// A commit was created and pushed.
    Committed(CommitHash),
    /// `git status --porcelain` was empty; nothing was committed or pushed.
    NoChanges,
}

impl CommitResult {
    /// The short hash, or the `"no-changes"` sentinel.
    pub fn as_str(&self) -> &str {
        match self {
            CommitResult::Committed(hash) => hash.as_str(),
            CommitResult::NoChanges => NO_CHANGES,
        }
    }

    pub fn hash(&self) -> Option<&CommitHash> {
        match self {
            CommitResult::Committed(hash) => Some(hash),
            CommitResult::NoChanges => None,
        }
    }
}

impl fmt::Display for CommitResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn newtype_display() {
        assert_eq!(DocumentName::from("profile").to_string(), "profile");
        assert_eq!(CommitHash::from("abc1234").to_string(), "abc1234");
    }

    #[test]
    fn document_name_rejects_path_tricks() {
        assert!(DocumentName::from("blog-hello").is_valid());
        assert!(!DocumentName::from("").is_valid());
        assert!(!DocumentName::from("../etc/passwd").is_valid());
        assert!(!DocumentName::from("a/b").is_valid());
        assert!(!DocumentName::from(".hidden").is_valid());
    }

    #[test]
    fn commit_result_sentinel() {
        assert_eq!(CommitResult::NoChanges.as_str(), "no-changes");
        assert_eq!(
            CommitResult::Committed(CommitHash::from("abc1234")).to_string(),
            "abc1234"
        );
        assert!(CommitResult::NoChanges.hash().is_none());
    }

    #[test]
    fn site_content_serialises_in_name_order() {
        let mut a = SiteContent::default();
        a.set("zeta".into(), Document::Markdown("z".into()));
        a.set("alpha".into(), Document::Json(json!({"b": 1, "a": 2})));

        let mut b = SiteContent::default();
        b.set("alpha".into(), Document::Json(json!({"a": 2, "b": 1})));
        b.set("zeta".into(), Document::Markdown("z".into()));

        assert_eq!(
            serde_json::to_string(&a).expect("serialize"),
            serde_json::to_string(&b).expect("serialize")
        );
    }

    #[test]
    fn document_tagged_roundtrip() {
        let doc = Document::Markdown("# Hello".into());
        let text = serde_json::to_string(&doc).expect("serialize");
        assert_eq!(text, r##"{"kind":"markdown","body":"# Hello"}"##);
        let back: Document = serde_json::from_str(&text).expect("deserialize");
        assert_eq!(back, doc);
    }
}
