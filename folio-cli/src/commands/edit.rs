//! `folio edit` — replace one document in the running session.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde_json::Value;

use folio_session::request_edit;

use super::session::not_running_hint;

/// Arguments for `folio edit`.
#[derive(Args, Debug)]
pub struct EditArgs {
    /// Document name, e.g. `profile` or `hello-world`.
    pub document: String,

    /// New content as a JSON value.
    #[arg(long, conflicts_with = "file", required_unless_present = "file")]
    pub json: Option<String>,

    /// Read new content from a file: `.json` files are parsed, anything else
    /// is sent as Markdown text.
    #[arg(long)]
    pub file: Option<PathBuf>,
}

impl EditArgs {
    pub fn run(self, site: &Path) -> Result<()> {
        let value = self.value()?;
        let data = not_running_hint(request_edit(site, &self.document, value), site)
            .with_context(|| format!("edit failed for '{}'", self.document))?;

        if data["dirty"].as_bool().unwrap_or(false) {
            println!("✎ '{}' edited {}", self.document, "(unsaved)".yellow());
        } else {
            println!("· '{}' matches the saved content", self.document);
        }
        Ok(())
    }

    fn value(&self) -> Result<Value> {
        if let Some(raw) = &self.json {
            return serde_json::from_str(raw).context("--json is not a valid JSON value");
        }
        let path = self
            .file
            .as_ref()
            .context("provide --json <value> or --file <path>")?;
        let text =
            fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            serde_json::from_str(&text).with_context(|| format!("parse {}", path.display()))
        } else {
            Ok(Value::String(text))
        }
    }
}
