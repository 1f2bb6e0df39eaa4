//! Provision-then-run entry point

use crate::error::{Error, Result};
use crate::exec::{ExecError, ExecOptions, OutputSinks, run_binary};
use crate::http::{ClientOptions, build_client};
use crate::install::provision;
use crate::platform::Platform;
use crate::reference::BinaryReference;
use reqwest::blocking::Client;
use sphinxlab_core::config::Config;
use sphinxlab_core::config::consts;
use sphinxlab_core::SphinxlabError;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Everything needed to locate, install, and launch one binary
#[derive(Debug, Clone)]
pub struct RunnerOptions {
    pub version: String,
    pub base_url: String,
    pub tool_name: String,
    /// Overrides the release layout when set
    pub binary_url: Option<String>,
    pub cache_root: PathBuf,
    /// Detected when `None`
    pub platform: Option<Platform>,
    pub network: ClientOptions,
    pub env: BTreeMap<String, String>,
    pub plantuml_command: Option<String>,
    pub timeout: Option<Duration>,
}

impl RunnerOptions {
    pub fn new(version: impl Into<String>, cache_root: impl Into<PathBuf>) -> Self {
        Self {
            version: version.into(),
            base_url: consts::sphinx::DEFAULT_BASE_URL.to_string(),
            tool_name: consts::sphinx::DEFAULT_TOOL_NAME.to_string(),
            binary_url: None,
            cache_root: cache_root.into(),
            platform: None,
            network: ClientOptions::default(),
            env: BTreeMap::new(),
            plantuml_command: None,
            timeout: None,
        }
    }

    /// Resolves options from a loaded sphinxlab.toml
    pub fn from_config(config: &Config) -> Result<Self> {
        let sphinx = &config.sphinx;
        let platform = sphinx
            .platform
            .as_deref()
            .map(Platform::from_classifier)
            .transpose()?;

        Ok(Self {
            version: sphinx.version.clone(),
            base_url: sphinx.base_url.clone(),
            tool_name: sphinx.tool_name.clone(),
            binary_url: sphinx.binary_url.clone(),
            cache_root: config.cache_dir()?,
            platform,
            network: ClientOptions::from_config(&config.network)?,
            env: config.exec.env.clone(),
            plantuml_command: sphinx.plantuml.clone(),
            timeout: config.exec.timeout(),
        })
    }
}

/// Downloads the pinned binary on first use and runs it
///
/// Cheap to share across threads: provisioning is safe to race.
#[derive(Debug)]
pub struct SphinxRunner {
    reference: BinaryReference,
    platform: Platform,
    cache_root: PathBuf,
    client: Client,
    env: BTreeMap<String, String>,
    plantuml_command: Option<String>,
    timeout: Option<Duration>,
}

impl SphinxRunner {
    pub fn new(options: RunnerOptions) -> Result<Self> {
        let platform = match options.platform {
            Some(platform) => platform,
            None => Platform::current()?,
        };

        let reference = match &options.binary_url {
            Some(url) => BinaryReference::from_url(url, &options.tool_name, &platform)?,
            None => BinaryReference::new(
                &options.base_url,
                &options.version,
                &options.tool_name,
                &platform,
            )?,
        };

        let client = build_client(&options.network).map_err(Error::Client)?;

        // The child runs in another directory, so the installed path must not be relative
        let cache_root = std::path::absolute(&options.cache_root).map_err(SphinxlabError::from)?;

        Ok(Self {
            reference,
            platform,
            cache_root,
            client,
            env: options.env,
            plantuml_command: options.plantuml_command,
            timeout: options.timeout,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(RunnerOptions::from_config(config)?)
    }

    pub fn reference(&self) -> &BinaryReference {
        &self.reference
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    pub fn cache_root(&self) -> &Path {
        &self.cache_root
    }

    /// Provisions the binary without running it
    pub fn resolve(&self) -> Result<PathBuf> {
        Ok(provision(&self.client, &self.reference, &self.cache_root)?)
    }

    /// Runs the binary with output forwarded to this process
    pub fn run(&self, working_dir: &Path, args: &[String]) -> Result<i32> {
        self.run_with_output(working_dir, args, OutputSinks::inherit())
    }

    /// Runs the binary with output sent to `sinks`
    ///
    /// An empty argument list fails before any network activity.
    pub fn run_with_output(
        &self,
        working_dir: &Path,
        args: &[String],
        sinks: OutputSinks,
    ) -> Result<i32> {
        if args.is_empty() {
            return Err(ExecError::EmptyArguments.into());
        }

        let binary = self.resolve()?;
        let options = ExecOptions {
            working_dir: working_dir.to_path_buf(),
            args: args.to_vec(),
            env: self.env.clone(),
            plantuml_command: self.plantuml_command.clone(),
            timeout: self.timeout,
        };

        Ok(run_binary(&binary, &options, sinks)?)
    }
}
