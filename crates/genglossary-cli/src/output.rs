//! Output formatting helpers for the `genglossary` CLI.
//!
//! Provides JSON output, table formatting, and row formatters for every
//! domain type the CLI prints: projects, runs, terms, and glossary entries.

use std::io::{self, Write};

use genglossary_core::enums::RunStatus;
use genglossary_storage::{GlossaryEntry, GlossaryIssue, ListedTerm, ProjectRecord, Run};
use owo_colors::OwoColorize;
use serde::Serialize;

/// Print a value as pretty-printed JSON to stdout.
///
/// Terminates the process with exit code 1 if serialization fails.
pub fn output_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            // Ignore broken pipe errors (e.g., piped to `head`).
            let _ = writeln!(handle, "{}", json);
        }
        Err(e) => {
            eprintln!("Error: failed to serialize JSON: {}", e);
            std::process::exit(1);
        }
    }
}

/// Print a simple table with headers and rows.
///
/// Each row is a `Vec<String>` with columns matching the headers. Column
/// widths are computed from the data for alignment.
pub fn output_table(headers: &[&str], rows: &[Vec<String>]) {
    if rows.is_empty() {
        println!("(none)");
        return;
    }

    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.len());
            }
        }
    }

    let stdout = io::stdout();
    let mut handle = stdout.lock();

    for (i, header) in headers.iter().enumerate() {
        if i > 0 {
            let _ = write!(handle, "  ");
        }
        let _ = write!(handle, "{:<width$}", header, width = widths[i]);
    }
    let _ = writeln!(handle);

    for (i, width) in widths.iter().enumerate() {
        if i > 0 {
            let _ = write!(handle, "  ");
        }
        let _ = write!(handle, "{}", "-".repeat(*width));
    }
    let _ = writeln!(handle);

    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if i > 0 {
                let _ = write!(handle, "  ");
            }
            if i < widths.len() {
                let _ = write!(handle, "{:<width$}", cell, width = widths[i]);
            } else {
                let _ = write!(handle, "{}", cell);
            }
        }
        let _ = writeln!(handle);
    }
}

/// Colors a run status for terminal display; plain text when color is
/// unavailable (piped output, `NO_COLOR`, etc. are handled by `owo_colors`
/// auto-detection at the call site's writer).
pub fn colored_run_status(status: RunStatus) -> String {
    match status {
        RunStatus::Completed => status.to_string().green().to_string(),
        RunStatus::Failed => status.to_string().red().to_string(),
        RunStatus::Cancelled => status.to_string().yellow().to_string(),
        RunStatus::Running => status.to_string().cyan().to_string(),
        RunStatus::Pending => status.to_string().dimmed().to_string(),
    }
}

pub fn format_project_row(project: &ProjectRecord) -> Vec<String> {
    vec![
        project.id.to_string(),
        project.name.clone(),
        project.status.to_string(),
        project.llm_provider.clone(),
        project.llm_model.clone(),
        project.last_run_at.clone().unwrap_or_else(|| "-".to_string()),
    ]
}

pub fn format_run_row(run: &Run) -> Vec<String> {
    vec![
        run.id.to_string(),
        run.scope.to_string(),
        colored_run_status(run.status),
        format!("{}/{}", run.progress_current, run.progress_total),
        run.triggered_by.clone(),
        run.error_message.clone().unwrap_or_default(),
    ]
}

pub fn format_term_row(term: &ListedTerm) -> Vec<String> {
    vec![term.id.to_string(), term.term_text.clone(), term.category.clone().unwrap_or_else(|| "-".to_string())]
}

pub fn format_glossary_row(entry: &GlossaryEntry) -> Vec<String> {
    vec![
        entry.term_name.clone(),
        entry.definition.clone(),
        format!("{:.2}", entry.confidence),
        entry.occurrences.len().to_string(),
    ]
}

pub fn format_issue_row(issue: &GlossaryIssue) -> Vec<String> {
    vec![
        issue.term_name.clone(),
        issue.issue_type.to_string(),
        issue.description.clone(),
        issue.should_exclude.to_string(),
    ]
}

/// Renders glossary entries as a Markdown table, matching the HTTP export
/// endpoint's renderer.
pub fn render_markdown(project_name: &str, entries: &[GlossaryEntry]) -> String {
    use std::fmt::Write as _;

    let mut out = String::new();
    let _ = writeln!(out, "# {project_name} glossary\n");
    let _ = writeln!(out, "| Term | Definition | Confidence |");
    let _ = writeln!(out, "|------|------------|------------|");
    for entry in entries {
        let _ = writeln!(
            out,
            "| {} | {} | {:.2} |",
            entry.term_name.replace('|', "\\|"),
            entry.definition.replace('|', "\\|").replace('\n', " "),
            entry.confidence,
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_row_has_six_columns() {
        let project = ProjectRecord {
            id: 1,
            name: "docs".into(),
            doc_root: None,
            db_path: "/tmp/docs.db".into(),
            llm_provider: "ollama".into(),
            llm_model: "llama3".into(),
            llm_base_url: None,
            status: genglossary_core::enums::ProjectStatus::Created,
            created_at: "2026-01-01T00:00:00.000Z".into(),
            updated_at: "2026-01-01T00:00:00.000Z".into(),
            last_run_at: None,
        };
        let row = format_project_row(&project);
        assert_eq!(row.len(), 6);
        assert_eq!(row[5], "-");
    }

    #[test]
    fn markdown_escapes_pipes() {
        let entries = vec![GlossaryEntry {
            id: 1,
            term_name: "widget".into(),
            definition: "a | pipe".into(),
            confidence: 0.5,
            occurrences: vec![],
        }];
        let markdown = render_markdown("docs", &entries);
        assert!(markdown.contains("a \\| pipe"));
    }

    #[test]
    fn table_output_smoke() {
        output_table(&["ID", "Name"], &[vec!["1".into(), "docs".into()]]);
    }
}
