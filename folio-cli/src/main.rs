//! Folio — edit, publish and track deploys of a flat-file personal site.
//!
//! # Usage
//!
//! ```text
//! folio [--site <dir>] serve
//! folio [--site <dir>] edit <document> (--json <value> | --file <path>)
//! folio [--site <dir>] save
//! folio [--site <dir>] publish [-m <message>]
//! folio [--site <dir>] status [--json]
//! folio [--site <dir>] cancel
//! folio [--site <dir>] stop
//! folio [--site <dir>] remote
//! folio [--site <dir>] deploy-status <sha> [--watch]
//! ```

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    deploy::DeployStatusArgs, edit::EditArgs, session::PublishArgs, status::StatusArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "folio",
    version,
    about = "Edit, publish and track deploys of a flat-file personal site",
    long_about = None,
)]
struct Cli {
    /// Site root (the git working tree holding the content directory).
    #[arg(long, global = true, default_value = ".")]
    site: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the editing session in the foreground.
    Serve,

    /// Replace one document in the running session.
    Edit(EditArgs),

    /// Write edited content to disk.
    Save,

    /// Commit and push saved content, then track the deploy.
    Publish(PublishArgs),

    /// Show session, publish and deploy state.
    Status(StatusArgs),

    /// Stop tracking the running deploy.
    Cancel,

    /// Shut the running session down.
    Stop,

    /// Print the CI repository resolved from the git remote.
    Remote,

    /// Check the deploy status of a pushed commit without a session.
    DeployStatus(DeployStatusArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    let site = cli.site;
    match cli.command {
        Commands::Serve => commands::session::serve(&site),
        Commands::Edit(args) => args.run(&site),
        Commands::Save => commands::session::save(&site),
        Commands::Publish(args) => args.run(&site),
        Commands::Status(args) => args.run(&site),
        Commands::Cancel => commands::session::cancel(&site),
        Commands::Stop => commands::session::stop(&site),
        Commands::Remote => commands::deploy::remote(&site),
        Commands::DeployStatus(args) => args.run(&site),
    }
}
