mod cli;
mod commands;
mod context;
mod logging;
mod output;

use clap::Parser;
use cli::{Cli, Commands};
use context::Context;

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let result = Context::new(cli.config.as_deref(), cli.verbose).and_then(|ctx| {
        match cli.command {
            Commands::Build(args) => commands::build::run(&ctx, args),
            Commands::Exec { args } => commands::exec::run(&ctx, args),
            Commands::Install { json } => commands::install::run(&ctx, json),
            Commands::Platform { json } => commands::platform::run(&ctx, json),
        }
    });

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
