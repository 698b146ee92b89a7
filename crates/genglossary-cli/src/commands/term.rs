//! `genglossary term ...` -- extracted-term overrides between pipeline runs.

use std::str::FromStr;

use genglossary_core::enums::TermSource;
use genglossary_core::validation::validate_term_text;
use genglossary_storage::SqliteStore;

use crate::cli::{ProjectRef, TermOverrideArgs};
use crate::context::RuntimeContext;
use crate::output::{format_term_row, output_json, output_table};

pub fn run_list(ctx: &RuntimeContext, args: &ProjectRef) -> anyhow::Result<()> {
    let registry = ctx.open_registry()?;
    let project = ctx.resolve_project(&registry, &args.project)?;
    let store = SqliteStore::open(&project.db_path)?;
    let terms = store.list_all_terms()?;

    if ctx.json {
        output_json(&terms);
    } else {
        let rows = terms.iter().map(format_term_row).collect::<Vec<_>>();
        output_table(&["ID", "Term", "Category"], &rows);
    }
    Ok(())
}

pub fn run_exclude(ctx: &RuntimeContext, args: &TermOverrideArgs) -> anyhow::Result<()> {
    apply_override(ctx, args, Direction::Exclude)
}

pub fn run_require(ctx: &RuntimeContext, args: &TermOverrideArgs) -> anyhow::Result<()> {
    apply_override(ctx, args, Direction::Require)
}

enum Direction {
    Exclude,
    Require,
}

fn apply_override(ctx: &RuntimeContext, args: &TermOverrideArgs, direction: Direction) -> anyhow::Result<()> {
    validate_term_text(&args.term)?;
    let source = TermSource::from_str(&args.source)
        .map_err(|s| anyhow::anyhow!("invalid term source '{s}' (expected 'manual' or 'auto')"))?;

    let registry = ctx.open_registry()?;
    let project = ctx.resolve_project(&registry, &args.project)?;
    let store = SqliteStore::open(&project.db_path)?;

    match direction {
        Direction::Exclude => store.exclude_term(&args.term, source)?,
        Direction::Require => store.require_term(&args.term, source)?,
    }

    if !ctx.json {
        let verb = match direction {
            Direction::Exclude => "excluded",
            Direction::Require => "required",
        };
        println!("{verb} '{}'", args.term);
    }
    Ok(())
}
