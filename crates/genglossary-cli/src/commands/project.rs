//! `genglossary project ...` -- the registry surface.

use anyhow::{bail, Context};

use genglossary_config::data_dir::project_db_path;
use genglossary_core::validation::validate_project_name;
use genglossary_storage::SqliteStore;

use crate::cli::{CloneProjectArgs, CreateProjectArgs, DeleteProjectArgs, ProjectRef};
use crate::context::RuntimeContext;
use crate::output::{format_project_row, output_json, output_table};

pub fn run_list(ctx: &RuntimeContext) -> anyhow::Result<()> {
    let registry = ctx.open_registry()?;
    let projects = registry.list_projects()?;

    if ctx.json {
        output_json(&projects);
    } else {
        let headers = ["ID", "Name", "Status", "Provider", "Model", "Last run"];
        let rows = projects.iter().map(format_project_row).collect::<Vec<_>>();
        output_table(&headers, &rows);
    }
    Ok(())
}

pub fn run_create(ctx: &RuntimeContext, args: &CreateProjectArgs) -> anyhow::Result<()> {
    validate_project_name(&args.name)?;

    let registry = ctx.open_registry()?;
    if registry.name_is_taken(&args.name, None)? {
        bail!("a project named '{}' already exists", args.name);
    }

    let db_path = project_db_path(&ctx.data_dir, &args.name);
    std::fs::create_dir_all(db_path.parent().context("project db path has no parent directory")?)?;

    let project = registry.create_project(
        &args.name,
        args.doc_root.as_deref(),
        &db_path.to_string_lossy(),
        &args.llm_provider,
        &args.llm_model,
        args.llm_base_url.as_deref(),
    )?;

    // Touching the project database up front means the first run doesn't
    // pay schema-init cost mid-run.
    SqliteStore::open(&project.db_path)?;

    if ctx.json {
        output_json(&project);
    } else {
        println!("created project '{}' (id {})", project.name, project.id);
    }
    Ok(())
}

pub fn run_show(ctx: &RuntimeContext, args: &ProjectRef) -> anyhow::Result<()> {
    let registry = ctx.open_registry()?;
    let project = ctx.resolve_project(&registry, &args.project)?;

    if ctx.json {
        output_json(&project);
    } else {
        output_table(
            &["ID", "Name", "Status", "Provider", "Model", "Last run"],
            std::slice::from_ref(&format_project_row(&project)),
        );
    }
    Ok(())
}

pub fn run_delete(ctx: &RuntimeContext, args: &DeleteProjectArgs) -> anyhow::Result<()> {
    let registry = ctx.open_registry()?;
    let project = ctx.resolve_project(&registry, &args.project)?;

    if args.remove_db {
        let _ = std::fs::remove_file(&project.db_path);
    }
    registry.delete_project(project.id)?;

    if !ctx.json {
        println!("deleted project '{}' (id {})", project.name, project.id);
    }
    Ok(())
}

pub fn run_clone(ctx: &RuntimeContext, args: &CloneProjectArgs) -> anyhow::Result<()> {
    let registry = ctx.open_registry()?;
    let source = ctx.resolve_project(&registry, &args.project)?;

    if registry.name_is_taken(&args.name, None)? {
        bail!("a project named '{}' already exists", args.name);
    }

    let new_db_path = project_db_path(&ctx.data_dir, &args.name);
    std::fs::create_dir_all(new_db_path.parent().context("project db path has no parent directory")?)?;

    let cloned = registry.clone_project(source.id, &args.name, &new_db_path.to_string_lossy())?;
    SqliteStore::open(&cloned.db_path)?;

    if ctx.json {
        output_json(&cloned);
    } else {
        println!("cloned '{}' into '{}' (id {})", source.name, cloned.name, cloned.id);
    }
    Ok(())
}
