//! Build command - generate documentation with the pinned Sphinx

use crate::cli::BuildArgs;
use crate::context::Context;
use anyhow::Result;
use colored::Colorize;
use sphinxlab_core::SphinxlabError;
use sphinxlab_core::config::BuildConfig;
use sphinxlab_core::output::{convert_line_separators, delete_cruft};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Build documentation
///
/// # Arguments
///
/// * `ctx` - Loaded configuration and working directory
/// * `overrides` - Command-line values that win over `[build]`
pub fn run(ctx: &Context, overrides: BuildArgs) -> Result<()> {
    let build = apply_overrides(ctx.config.build.clone(), overrides);
    let verbose = ctx.verbose;

    // Step 1: Prepare directories
    let source_dir = prepare_dir(&ctx.resolve_path(&build.source_dir))?;
    let output_dir = prepare_dir(&ctx.resolve_path(&build.output_dir))?;

    if verbose {
        println!("{} Source: {}", "→".cyan(), source_dir.display());
        println!("{} Output: {}", "→".cyan(), output_dir.display());
    }

    // Step 2: Provision Sphinx and run the builder
    let args = build_args(&build, &source_dir, &output_dir);
    if verbose {
        println!("  Command: sphinx {}", args.join(" "));
    }

    let runner = ctx.runner()?;
    let start_time = Instant::now();
    let exit_code = runner.run(&ctx.cwd, &args)?;

    if exit_code != 0 {
        eprintln!("{} Build failed", "✗".red().bold());
        return Err(SphinxlabError::BuildFailed(format!(
            "Sphinx documentation generation failed (exit code {})",
            exit_code
        ))
        .into());
    }

    // Step 3: Post-process output
    let converted = convert_line_separators(&output_dir)?;
    if verbose {
        println!(
            "{} Normalized line separators in {} file(s)",
            "→".cyan(),
            converted
        );
    }

    if build.site_cruft {
        let removed = delete_cruft(&output_dir)?;
        if verbose {
            println!("{} Removed {} site leftover(s)", "→".cyan(), removed);
        }
    }

    println!(
        "{} Built documentation to {} ({}ms)",
        "✓".green().bold(),
        output_dir.display(),
        start_time.elapsed().as_millis()
    );

    Ok(())
}

fn apply_overrides(mut build: BuildConfig, overrides: BuildArgs) -> BuildConfig {
    if let Some(source_dir) = overrides.source_dir {
        build.source_dir = source_dir;
    }
    if let Some(output_dir) = overrides.output_dir {
        build.output_dir = output_dir;
    }
    if let Some(builder) = overrides.builder {
        build.builder = builder;
    }
    build.tags.extend(overrides.tags);
    build.force |= overrides.force;
    build.warnings_as_errors |= overrides.warnings_as_errors;
    build.site_cruft |= overrides.site_cruft;
    if overrides.quiet {
        build.verbose = false;
    }
    build
}

/// Creates `path` if needed and returns its canonical form
fn prepare_dir(path: &Path) -> Result<PathBuf, SphinxlabError> {
    let invalid = |e: std::io::Error| SphinxlabError::BuildDirectoryInvalid {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };

    fs::create_dir_all(path).map_err(invalid)?;
    fs::canonicalize(path).map_err(invalid)
}

/// Sphinx command line for one build
pub fn build_args(build: &BuildConfig, source_dir: &Path, output_dir: &Path) -> Vec<String> {
    let mut args = Vec::new();

    args.push(if build.verbose { "-v" } else { "-Q" }.to_string());
    if build.warnings_as_errors {
        args.push("-W".to_string());
    }
    if build.force {
        args.push("-a".to_string());
        args.push("-E".to_string());
    }
    for tag in &build.tags {
        args.push("-t".to_string());
        args.push(tag.clone());
    }

    // Nit-picky mode: warn about all missing references
    args.push("-n".to_string());

    args.push("-b".to_string());
    args.push(build.builder.clone());
    args.push(source_dir.display().to_string());
    args.push(output_dir.display().to_string());
    args
}
