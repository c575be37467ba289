//! Flat-file content store.
//!
//! # Storage layout
//!
//! ```text
//! <site>/content/
//!   profile.json          (Document::Json, pretty-printed)
//!   blog-hello-world.md   (Document::Markdown)
//! ```
//!
//! ## `write` — per-document protocol
//!
//! 1. Render the document text (CRLF normalised to LF).
//! 2. Compare with the file on disk → skip if identical.
//! 3. Write to `<path>.folio.tmp`.
//! 4. Rename to the final path (atomic on POSIX).
//! 5. Remove the same name under the other extension, if the document
//!    changed kind.
//!
//! A name present as both `.json` and `.md` is refused on load.

use std::path::{Path, PathBuf};

use crate::error::{io_err, ContentError};
use crate::types::{Document, DocumentName, SiteContent};

/// Persistence contract the editing session depends on.
pub trait ContentStore: Send + Sync {
    fn load(&self) -> Result<SiteContent, ContentError>;
    fn write(&self, content: &SiteContent) -> Result<(), ContentError>;
}

/// [`ContentStore`] over a directory of `.json` and `.md` files.
#[derive(Debug, Clone)]
pub struct FlatFileStore {
    root: PathBuf,
}

impl FlatFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path of a document inside the content root: `<root>/<name>.<ext>`.
    pub fn document_path(&self, name: &DocumentName, document: &Document) -> PathBuf {
        self.root
            .join(format!("{}.{}", name.0, document.extension()))
    }

    fn sibling_path(&self, name: &DocumentName, document: &Document) -> PathBuf {
        self.root
            .join(format!("{}.{}", name.0, document.other_extension()))
    }
}

impl ContentStore for FlatFileStore {
    fn load(&self) -> Result<SiteContent, ContentError> {
        let mut content = SiteContent::default();
        if !self.root.exists() {
            return Ok(content);
        }

        let entries = std::fs::read_dir(&self.root).map_err(|e| io_err(&self.root, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| io_err(&self.root, e))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let (Some(stem), Some(ext)) = (
                path.file_stem().and_then(|s| s.to_str()),
                path.extension().and_then(|s| s.to_str()),
            ) else {
                continue;
            };
            let name = DocumentName::from(stem);
            if !name.is_valid() {
                continue;
            }

            let document = match ext {
                "json" => {
                    let text = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
                    let value = serde_json::from_str(&text).map_err(|source| {
                        ContentError::Json {
                            path: path.clone(),
                            source,
                        }
                    })?;
                    Document::Json(value)
                }
                "md" => {
                    let text = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
                    Document::Markdown(text.replace("\r\n", "\n"))
                }
                _ => continue,
            };
            if content.get(&name).is_some() {
                return Err(ContentError::Conflicting {
                    name: name.0,
                    root: self.root.clone(),
                });
            }
            content.set(name, document);
        }

        tracing::debug!(
            root = %self.root.display(),
            documents = content.len(),
            "loaded site content"
        );
        Ok(content)
    }

    fn write(&self, content: &SiteContent) -> Result<(), ContentError> {
        for (name, document) in &content.documents {
            if !name.is_valid() {
                return Err(ContentError::InvalidName(name.0.clone()));
            }
            let path = self.document_path(name, document);
            let text = render(document, &path)?;
            write_if_changed(&path, &text)?;
            remove_if_present(&self.sibling_path(name, document))?;
        }
        Ok(())
    }
}

fn render(document: &Document, path: &Path) -> Result<String, ContentError> {
    match document {
        Document::Json(value) => {
            let mut text =
                serde_json::to_string_pretty(value).map_err(|source| ContentError::Json {
                    path: path.to_path_buf(),
                    source,
                })?;
            text.push('\n');
            Ok(text)
        }
        Document::Markdown(body) => Ok(body.replace("\r\n", "\n")),
    }
}

fn write_if_changed(path: &Path, text: &str) -> Result<bool, ContentError> {
    match std::fs::read_to_string(path) {
        Ok(existing) if existing == text => {
            tracing::debug!(path = %path.display(), "document unchanged");
            return Ok(false);
        }
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(io_err(path, e)),
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }

    let tmp = PathBuf::from(format!("{}.folio.tmp", path.display()));
    std::fs::write(&tmp, text).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }

    tracing::info!(path = %path.display(), "document written");
    Ok(true)
}

fn remove_if_present(path: &Path) -> Result<(), ContentError> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            tracing::info!(path = %path.display(), "removed document of the other kind");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(io_err(path, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn sample() -> SiteContent {
        let mut content = SiteContent::default();
        content.set(
            "profile".into(),
            Document::Json(json!({ "name": "Ada", "skills": ["rust"] })),
        );
        content.set(
            "blog-hello".into(),
            Document::Markdown("# Hello\r\n\r\nFirst post.\r\n".into()),
        );
        content
    }

    #[test]
    fn load_missing_dir_is_empty() {
        let tmp = TempDir::new().unwrap();
        let store = FlatFileStore::new(tmp.path().join("content"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn write_then_load_normalises_line_endings() {
        let tmp = TempDir::new().unwrap();
        let store = FlatFileStore::new(tmp.path().join("content"));
        store.write(&sample()).unwrap();

        let md = std::fs::read_to_string(tmp.path().join("content/blog-hello.md")).unwrap();
        assert!(!md.contains('\r'));

        let loaded = store.load().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(
            loaded.get(&"blog-hello".into()),
            Some(&Document::Markdown("# Hello\n\nFirst post.\n".into()))
        );
        assert_eq!(
            loaded.get(&"profile".into()),
            sample().get(&"profile".into())
        );
    }

    #[test]
    fn unchanged_document_is_not_rewritten() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("content");
        std::fs::create_dir_all(&root).unwrap();
        let path = root.join("notes.md");
        assert!(write_if_changed(&path, "same\n").unwrap());
        assert!(!write_if_changed(&path, "same\n").unwrap());
        assert!(write_if_changed(&path, "different\n").unwrap());
        let tmp_path = PathBuf::from(format!("{}.folio.tmp", path.display()));
        assert!(!tmp_path.exists(), "tmp file should be removed after rename");
    }

    #[test]
    fn write_rejects_escaping_names() {
        let tmp = TempDir::new().unwrap();
        let store = FlatFileStore::new(tmp.path());
        let mut content = SiteContent::default();
        content.set("../outside".into(), Document::Markdown("x".into()));
        let err = store.write(&content).unwrap_err();
        assert!(matches!(err, ContentError::InvalidName(_)), "got: {err}");
    }

    #[test]
    fn load_refuses_a_name_stored_as_both_kinds() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("about.md"), "# About\n").unwrap();
        std::fs::write(tmp.path().join("about.json"), "{}").unwrap();
        let err = FlatFileStore::new(tmp.path()).load().unwrap_err();
        assert!(
            matches!(err, ContentError::Conflicting { ref name, .. } if name == "about"),
            "got: {err}"
        );
    }

    #[test]
    fn load_reports_corrupt_json_with_path() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("broken.json"), "{ not json").unwrap();
        let err = FlatFileStore::new(tmp.path()).load().unwrap_err();
        assert!(err.to_string().contains("broken.json"), "got: {err}");
    }
}
