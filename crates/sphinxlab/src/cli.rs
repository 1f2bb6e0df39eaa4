//! CLI command structure using clap

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sphinxlab")]
#[command(version, about = "Version-pinned Sphinx documentation builds", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (default: ./sphinxlab.toml when present)
    #[arg(long, global = true, env = "SPHINXLAB_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build documentation with the pinned Sphinx
    Build(BuildArgs),

    /// Run the pinned Sphinx with arbitrary arguments
    #[command(trailing_var_arg = true)]
    Exec {
        /// Arguments to pass to Sphinx (after --)
        #[arg(allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Download and verify the pinned Sphinx without running it
    Install {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the platform classifier used to pick a binary
    Platform {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Overrides for the `[build]` section
#[derive(Args, Debug, Default)]
pub struct BuildArgs {
    /// Directory containing conf.py
    #[arg(long)]
    pub source_dir: Option<PathBuf>,

    /// Directory the builder writes to
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Sphinx builder name (html, dirhtml, man, ...)
    #[arg(short, long)]
    pub builder: Option<String>,

    /// Define a Sphinx tag (repeatable)
    #[arg(short, long = "tag")]
    pub tags: Vec<String>,

    /// Rebuild everything instead of only changed files
    #[arg(short = 'a', long)]
    pub force: bool,

    /// Turn warnings into errors
    #[arg(short = 'W', long)]
    pub warnings_as_errors: bool,

    /// Only print warnings and errors from Sphinx
    #[arg(short, long)]
    pub quiet: bool,

    /// Delete maven-site leftovers from the output directory afterwards
    #[arg(long)]
    pub site_cruft: bool,
}
