//! `folio status` — session, publish and deploy visibility.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde_json::{json, Value};

use folio_session::paths::socket_path;
use folio_session::{request_status, SessionError};

use super::paint_outcome;

/// Arguments for `folio status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self, site: &Path) -> Result<()> {
        let status = match request_status(site) {
            Ok(mut status) => {
                status["running"] = Value::Bool(true);
                status
            }
            Err(SessionError::SessionNotRunning { .. }) => json!({
                "running": false,
                "socket": socket_path(site).display().to_string(),
            }),
            Err(err) => return Err(err).context("failed to query session status"),
        };

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&status)
                    .context("failed to render session status JSON")?
            );
        } else {
            print_human(site, &status);
        }
        Ok(())
    }
}

fn print_human(site: &Path, status: &Value) {
    if !status["running"].as_bool().unwrap_or(false) {
        println!("session is not running for {}", site.display());
        return;
    }

    let flag = |key: &str| status[key].as_bool().unwrap_or(false);
    println!("{:<13}{}", "documents", status["documents"]);
    println!(
        "{:<13}{}",
        "unsaved",
        if flag("dirty") { "yes".yellow() } else { "no".normal() }
    );
    println!(
        "{:<13}{}",
        "unpublished",
        if flag("unpublished") { "yes".yellow() } else { "no".normal() }
    );
    if flag("publishing") {
        println!("{:<13}{}", "publish", "in progress".yellow());
    } else if status["message"].is_string() {
        println!("{:<13}{}", "publish", paint_outcome(status));
    }

    let deploy = &status["deploy"];
    if deploy.is_object() {
        let seconds = deploy["elapsed_ms"].as_u64().unwrap_or(0) as f64 / 1000.0;
        println!(
            "{:<13}{}/{} · {} polls · {:.1}s",
            "deploy",
            deploy["repo"]["owner"].as_str().unwrap_or_default(),
            deploy["repo"]["repo"].as_str().unwrap_or_default(),
            deploy["polls"],
            seconds
        );
        if let Some(error) = deploy["last_error"].as_str() {
            println!("{:<13}{}", "last error", error.red());
        }
    }
}
