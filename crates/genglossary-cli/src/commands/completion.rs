//! `genglossary completion ...` -- shell completion script generation.

use clap::CommandFactory;
use clap_complete::generate;

use crate::cli::{Cli, CompletionArgs};

pub fn run(args: &CompletionArgs) {
    let mut command = Cli::command();
    let name = command.get_name().to_string();
    generate(args.shell, &mut command, name, &mut std::io::stdout());
}
