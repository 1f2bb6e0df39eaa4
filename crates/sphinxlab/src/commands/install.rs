//! Install command - provision the pinned Sphinx binary without running it

use crate::context::Context;
use crate::output::{print_json, print_text};
use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Serialize)]
struct InstallReport {
    version: String,
    platform: String,
    url: String,
    cache_key: String,
    path: PathBuf,
}

/// Execute `sphinxlab install`
pub fn run(ctx: &Context, json: bool) -> Result<()> {
    let runner = ctx.runner()?;
    let reference = runner.reference();

    if ctx.verbose && !json {
        println!("{} Cache root: {}", "→".cyan(), runner.cache_root().display());
    }

    let path = runner.resolve()?;

    if json {
        return print_json(&InstallReport {
            version: ctx.config.sphinx.version.clone(),
            platform: runner.platform().classifier(),
            url: reference.binary_url().to_string(),
            cache_key: reference.cache_key().to_string(),
            path,
        });
    }

    print_text(&format!(
        "{} Sphinx {} ({}) ready at {}",
        "✓".green().bold(),
        ctx.config.sphinx.version,
        runner.platform(),
        path.display()
    ))?;
    Ok(())
}
