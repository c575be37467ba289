//! `folio serve|save|publish|cancel|stop` — session lifecycle over the socket.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;

use folio_session::{
    request_cancel, request_publish, request_save, request_stop, start_blocking, SessionError,
};

use super::paint_outcome;

/// Arguments for `folio publish`.
#[derive(Args, Debug)]
pub struct PublishArgs {
    /// Commit message (defaults to the configured message).
    #[arg(short, long)]
    pub message: Option<String>,
}

impl PublishArgs {
    pub fn run(self, site: &Path) -> Result<()> {
        let data = not_running_hint(request_publish(site, self.message), site)
            .context("publish failed")?;
        println!("{}", paint_outcome(&data));
        Ok(())
    }
}

pub fn serve(site: &Path) -> Result<()> {
    start_blocking(site).context("session exited with error")
}

pub fn save(site: &Path) -> Result<()> {
    let data = not_running_hint(request_save(site), site).context("save failed")?;
    println!("{}", paint_outcome(&data));
    Ok(())
}

pub fn cancel(site: &Path) -> Result<()> {
    let data = not_running_hint(request_cancel(site), site).context("cancel failed")?;
    if data["cancelled"].as_bool().unwrap_or(false) {
        println!("{}", paint_outcome(&data));
    } else {
        println!("no deploy is being tracked");
    }
    Ok(())
}

pub fn stop(site: &Path) -> Result<()> {
    match request_stop(site) {
        Ok(()) => println!("session stop requested"),
        Err(SessionError::SessionNotRunning { .. }) => println!("session is not running"),
        Err(err) => return Err(err).context("failed to stop session"),
    }
    Ok(())
}

/// Turn a missing socket into an actionable message.
pub fn not_running_hint<T>(result: Result<T, SessionError>, site: &Path) -> Result<T> {
    result.map_err(|err| match err {
        SessionError::SessionNotRunning { .. } => anyhow::anyhow!(
            "no session running for {}; start one with `folio --site {} serve`",
            site.display(),
            site.display()
        ),
        other => other.into(),
    })
}
