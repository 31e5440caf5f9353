//! CLI Module
//!
//! Command-line interface for the photocard editor core.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Photocard - layered photo-card templates, editing, and PSD import
#[derive(Parser, Debug)]
#[command(name = "photocard")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Editor configuration file (JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Import a PSD file as a template
    #[command(name = "import-psd")]
    ImportPsd {
        /// PSD file to import
        file: PathBuf,

        /// Directory to write the template and its assets to
        #[arg(short, long)]
        out: PathBuf,
    },

    /// Validate a template file
    #[command(name = "validate")]
    Validate {
        /// Template JSON file
        template: PathBuf,
    },

    /// List the templates in a directory
    #[command(name = "templates")]
    Templates {
        /// Directory to scan
        dir: PathBuf,
    },

    /// Start a new work from a template
    #[command(name = "create-work")]
    CreateWork {
        /// Work store directory
        #[arg(short, long)]
        store: PathBuf,

        /// Template JSON file
        #[arg(short, long)]
        template: PathBuf,

        /// Title of the work
        #[arg(long, default_value = "Untitled card")]
        title: String,
    },

    /// List saved works
    #[command(name = "list-works")]
    ListWorks {
        /// Work store directory
        #[arg(short, long)]
        store: PathBuf,
    },

    /// Apply a JSON script of edit operations to a work
    #[command(name = "edit")]
    Edit {
        /// Work store directory
        #[arg(short, long)]
        store: PathBuf,

        /// Work id
        #[arg(short, long)]
        work: String,

        /// JSON file holding an array of operations
        #[arg(long)]
        ops: PathBuf,
    },

    /// Render a work to PNG
    #[command(name = "render")]
    Render {
        /// Work store directory
        #[arg(short, long)]
        store: PathBuf,

        /// Work id
        #[arg(short, long)]
        work: String,

        /// Output PNG path
        #[arg(short, long)]
        out: PathBuf,
    },

    /// Print a work's template and state
    #[command(name = "print-state")]
    PrintState {
        /// Work store directory
        #[arg(short, long)]
        store: PathBuf,

        /// Work id
        #[arg(short, long)]
        work: String,
    },
}
