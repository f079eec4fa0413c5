//! Command-line surface for the `elixir` binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "elixir")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Cross-reference indexing for tagged releases of a source tree")]
pub struct Cli {
    /// Path to a settings.toml, overriding workspace discovery.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// In multi-project mode (`projects_root` configured), the project
    /// subdirectory to operate on. Defaults to the first one found.
    #[arg(long, global = true)]
    pub project: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a configuration file at .elixir/settings.toml
    Init {
        #[arg(short, long)]
        force: bool,
    },

    /// Extract definitions and references for every un-indexed tag
    Update {
        /// Worker pool size (clamped to the minimum of 5)
        #[arg(short, long)]
        workers: Option<usize>,

        /// Index only this tag, even if others are un-indexed
        #[arg(long)]
        tag: Option<String>,

        /// Suppress the progress bar
        #[arg(long)]
        quiet: bool,
    },

    /// List tags known to the repository and their indexed status
    Tags,

    /// Query the cross-reference database
    Query {
        /// Tag to query against
        tag: String,

        #[command(subcommand)]
        what: QueryCommand,
    },

    /// Show the current configuration
    Config,
}

#[derive(Subcommand)]
pub enum QueryCommand {
    /// List every definition in the blob a path resolves to
    File { path: PathBuf },

    /// List definitions and references for an identifier
    Ident {
        name: String,

        /// Narrow to one family: C, K, D, or M
        #[arg(short, long)]
        family: Option<String>,

        /// Emit the REST-contract JSON shape instead of a table
        #[arg(long)]
        json: bool,
    },

    /// List identifiers starting with a prefix
    Complete { prefix: String },
}
