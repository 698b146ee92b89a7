//! `genglossary` -- CLI client for the glossary generation pipeline engine.
//!
//! Parses arguments with clap, resolves the runtime context (data
//! directory, output mode), and dispatches to command handlers. Every
//! command opens its own registry/project connections for the life of the
//! invocation; there is no long-running daemon process here, unlike
//! `genglossary-http`.

mod cli;
mod commands;
mod context;
mod output;

use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;

use cli::{Cli, Commands, ConfigCommand, DocCommand, GlossaryCommand, ProjectCommand, RunCommand, TermCommand};
use context::RuntimeContext;

/// Tracks whether a Ctrl+C has already been received.
static CTRLC_RECEIVED: AtomicBool = AtomicBool::new(false);

fn main() {
    // First Ctrl+C: exit cleanly. Second: force exit. A run in progress is
    // left for its worker thread to finalize on its own next access; there
    // is no cleanup to run here.
    let _ = ctrlc::set_handler(|| {
        if CTRLC_RECEIVED.swap(true, Ordering::SeqCst) {
            std::process::exit(1);
        }
        std::process::exit(0);
    });

    let cli = Cli::parse();
    let json = cli.global.json;

    let result = run(cli);

    if let Err(e) = result {
        if json {
            let err_json = serde_json::json!({ "error": format!("{:#}", e) });
            if let Ok(s) = serde_json::to_string_pretty(&err_json) {
                eprintln!("{}", s);
            }
        } else {
            eprintln!("Error: {:#}", e);
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let ctx = RuntimeContext::from_global_args(&cli.global)?;

    if ctx.verbose {
        tracing_subscriber::fmt().with_env_filter("genglossary=debug").with_writer(std::io::stderr).init();
    }

    match cli.command {
        Some(Commands::Project(args)) => match args.command {
            ProjectCommand::List => commands::project::run_list(&ctx),
            ProjectCommand::Create(args) => commands::project::run_create(&ctx, &args),
            ProjectCommand::Show(args) => commands::project::run_show(&ctx, &args),
            ProjectCommand::Delete(args) => commands::project::run_delete(&ctx, &args),
            ProjectCommand::Clone(args) => commands::project::run_clone(&ctx, &args),
        },
        Some(Commands::Doc(args)) => match args.command {
            DocCommand::List(args) => commands::doc::run_list(&ctx, &args),
            DocCommand::Add(args) => commands::doc::run_add(&ctx, &args),
        },
        Some(Commands::Term(args)) => match args.command {
            TermCommand::List(args) => commands::term::run_list(&ctx, &args),
            TermCommand::Exclude(args) => commands::term::run_exclude(&ctx, &args),
            TermCommand::Require(args) => commands::term::run_require(&ctx, &args),
        },
        Some(Commands::Run(args)) => match args.command {
            RunCommand::Start(args) => commands::run::run_start(&ctx, &args),
            RunCommand::Cancel(args) => commands::run::run_cancel(&ctx, &args),
            RunCommand::Status(args) => commands::run::run_status(&ctx, &args),
            RunCommand::List(args) => commands::run::run_list(&ctx, &args),
            RunCommand::Logs(args) => commands::run::run_logs(&ctx, &args),
        },
        Some(Commands::Glossary(args)) => match args.command {
            GlossaryCommand::Show(args) => commands::glossary::run_show(&ctx, &args),
            GlossaryCommand::Issues(args) => commands::glossary::run_issues(&ctx, &args),
            GlossaryCommand::Export(args) => commands::glossary::run_export(&ctx, &args),
        },
        Some(Commands::Completion(args)) => {
            commands::completion::run(&args);
            Ok(())
        }
        Some(Commands::Config(args)) => match args.command {
            ConfigCommand::Show => commands::config::run_show(&ctx),
            ConfigCommand::Set(args) => commands::config::run_set(&ctx, &args),
        },
        None => {
            use clap::CommandFactory;
            Cli::command().print_help().ok();
            println!();
            Ok(())
        }
    }
}
