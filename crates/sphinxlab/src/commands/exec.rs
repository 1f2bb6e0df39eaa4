//! Exec command - run the pinned Sphinx binary with arguments

use crate::context::Context;
use anyhow::Result;
use tracing::debug;

/// Execute `sphinxlab exec -- <args>`
///
/// Output is streamed as it is produced; the process exits with Sphinx's
/// exit code.
pub fn run(ctx: &Context, args: Vec<String>) -> Result<()> {
    let runner = ctx.runner()?;
    let exit_code = runner.run(&ctx.cwd, &args)?;

    if exit_code != 0 {
        debug!("Sphinx exited with {}, forwarding it", exit_code);
        std::process::exit(exit_code);
    }

    Ok(())
}
