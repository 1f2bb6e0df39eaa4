//! Platform command - show the classifier used to select a binary

use crate::context::Context;
use crate::output::{print_json, print_text};
use anyhow::Result;
use serde::Serialize;
use sphinxlab_binary::Platform;
use tracing::debug;

#[derive(Serialize)]
struct PlatformReport {
    classifier: String,
    os: &'static str,
    arch: &'static str,
    executable_suffix: &'static str,
    detected: bool,
}

/// Execute `sphinxlab platform`
pub fn run(ctx: &Context, json: bool) -> Result<()> {
    let (platform, detected) = match &ctx.config.sphinx.platform {
        Some(classifier) => (Platform::from_classifier(classifier)?, false),
        None => (Platform::current()?, true),
    };
    debug!(
        "Platform {} ({})",
        platform,
        if detected { "detected" } else { "configured" }
    );

    if json {
        return print_json(&PlatformReport {
            classifier: platform.classifier(),
            os: platform.os().as_str(),
            arch: platform.arch().as_str(),
            executable_suffix: platform.executable_suffix(),
            detected,
        });
    }

    print_text(&platform.classifier())?;
    Ok(())
}
