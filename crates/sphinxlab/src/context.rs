//! Global context for CLI commands

use anyhow::{Context as _, Result};
use sphinxlab_binary::SphinxRunner;
use sphinxlab_core::config::Config;
use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Working directory and loaded configuration
pub struct Context {
    pub cwd: PathBuf,
    pub config: Config,
    pub verbose: bool,
}

impl Context {
    /// Loads `config_path`, or `./sphinxlab.toml` when present, or the defaults
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The current directory is unavailable
    /// - An explicitly given config file is missing
    /// - The config file cannot be parsed or fails validation
    pub fn new(config_path: Option<&Path>, verbose: bool) -> Result<Self> {
        let cwd = env::current_dir().context("Failed to determine current directory")?;

        let config = match config_path {
            Some(path) => {
                let path = cwd.join(path);
                debug!("Using configuration {}", path.display());
                Config::from_file(path)?
            }
            None => Config::load(&cwd)?,
        };

        Ok(Self {
            cwd,
            config,
            verbose,
        })
    }

    /// Runner for the configured Sphinx binary
    pub fn runner(&self) -> Result<SphinxRunner> {
        let runner = SphinxRunner::from_config(&self.config)?;
        debug!(
            "Sphinx {} for {} from {}",
            self.config.sphinx.version,
            runner.platform(),
            runner.reference().binary_url()
        );
        Ok(runner)
    }

    /// Resolves `path` against the working directory
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        self.cwd.join(path)
    }
}
