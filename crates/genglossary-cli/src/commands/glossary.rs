//! `genglossary glossary ...` -- reads and the Markdown export.

use genglossary_storage::{GlossaryStage, SqliteStore};

use crate::cli::{GlossaryExportArgs, GlossaryShowArgs, ProjectRef};
use crate::context::RuntimeContext;
use crate::output::{format_glossary_row, format_issue_row, output_json, output_table, render_markdown};

fn parse_stage(s: &str) -> anyhow::Result<GlossaryStage> {
    match s {
        "provisional" => Ok(GlossaryStage::Provisional),
        "refined" => Ok(GlossaryStage::Refined),
        other => Err(anyhow::anyhow!("invalid glossary stage '{other}' (expected 'provisional' or 'refined')")),
    }
}

pub fn run_show(ctx: &RuntimeContext, args: &GlossaryShowArgs) -> anyhow::Result<()> {
    let stage = parse_stage(&args.stage)?;
    let registry = ctx.open_registry()?;
    let project = ctx.resolve_project(&registry, &args.project)?;
    let store = SqliteStore::open(&project.db_path)?;
    let entries = store.list_glossary(stage)?;

    if ctx.json {
        output_json(&entries);
    } else {
        let rows = entries.iter().map(format_glossary_row).collect::<Vec<_>>();
        output_table(&["Term", "Definition", "Confidence", "Occurrences"], &rows);
    }
    Ok(())
}

pub fn run_issues(ctx: &RuntimeContext, args: &ProjectRef) -> anyhow::Result<()> {
    let registry = ctx.open_registry()?;
    let project = ctx.resolve_project(&registry, &args.project)?;
    let store = SqliteStore::open(&project.db_path)?;
    let issues = store.list_glossary_issues()?;

    if ctx.json {
        output_json(&issues);
    } else {
        let rows = issues.iter().map(format_issue_row).collect::<Vec<_>>();
        output_table(&["Term", "Type", "Description", "Should exclude"], &rows);
    }
    Ok(())
}

pub fn run_export(ctx: &RuntimeContext, args: &GlossaryExportArgs) -> anyhow::Result<()> {
    let stage = parse_stage(&args.stage)?;
    let registry = ctx.open_registry()?;
    let project = ctx.resolve_project(&registry, &args.project)?;
    let store = SqliteStore::open(&project.db_path)?;
    let entries = store.list_glossary(stage)?;

    let markdown = render_markdown(&project.name, &entries);
    match &args.out {
        Some(path) => {
            std::fs::write(path, &markdown)?;
            if !ctx.json {
                println!("wrote {path}");
            }
        }
        None => print!("{markdown}"),
    }
    Ok(())
}
