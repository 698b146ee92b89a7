//! `genglossary doc ...` -- loading documents directly into a project's
//! database, for cases with no filesystem `doc_root` to fall back to.

use anyhow::Context;
use std::path::Path;

use genglossary_core::validation::{validate_document_size, validate_file_name};
use genglossary_storage::SqliteStore;

use crate::cli::{AddDocArgs, ProjectRef};
use crate::context::RuntimeContext;
use crate::output::output_json;

pub fn run_list(ctx: &RuntimeContext, args: &ProjectRef) -> anyhow::Result<()> {
    let registry = ctx.open_registry()?;
    let project = ctx.resolve_project(&registry, &args.project)?;
    let store = SqliteStore::open(&project.db_path)?;
    let documents = store.list_documents()?;

    if ctx.json {
        output_json(&documents);
    } else if documents.is_empty() {
        println!("(no documents loaded)");
    } else {
        for doc in &documents {
            println!("{}  {} bytes  {}", doc.file_name, doc.content.len(), doc.content_hash);
        }
    }
    Ok(())
}

pub fn run_add(ctx: &RuntimeContext, args: &AddDocArgs) -> anyhow::Result<()> {
    let path = Path::new(&args.file);
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow::anyhow!("'{}' has no usable file name", args.file))?;

    validate_file_name(file_name)?;
    let content = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    validate_document_size(content.len() as u64)?;

    let registry = ctx.open_registry()?;
    let project = ctx.resolve_project(&registry, &args.project)?;
    let store = SqliteStore::open(&project.db_path)?;
    let document = store.upsert_document_by_path(file_name, &content)?;

    if ctx.json {
        output_json(&document);
    } else {
        println!("loaded '{}' ({} bytes)", document.file_name, document.content.len());
    }
    Ok(())
}
