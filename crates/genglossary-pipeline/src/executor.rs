//! Stage dispatch, cancellation discipline, and the four stage contracts.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::json;

use genglossary_core::enums::{IssueType, RunScope, Stage, TermSource};
use genglossary_llm::LlmClient;
use genglossary_storage::{GlossaryEntry, GlossaryIssue, GlossaryStage, Occurrence, SqliteStore};

use crate::documents::load_documents;
use crate::error::{PipelineError, Result};
use crate::log_bus::LogEvent;
use crate::noun_extractor::NounExtractor;
use crate::prompt::{envelope, with_data_warning};

/// Default batch size for LLM classification/review calls, per §4.6.
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// A run's cancellation flag. Cheap to clone; every clone observes the same
/// underlying signal.
#[derive(Debug, Clone)]
pub struct CancelSignal(Arc<AtomicBool>);

impl CancelSignal {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Threaded through every stage so the executor holds no per-run state of
/// its own: a run id for log attribution, a callback for structured log
/// events, and the cancellation signal.
pub struct ExecutionContext {
    pub run_id: i64,
    pub log: Arc<dyn Fn(LogEvent) + Send + Sync>,
    pub cancel: CancelSignal,
}

impl ExecutionContext {
    pub fn new(run_id: i64, log: Arc<dyn Fn(LogEvent) + Send + Sync>, cancel: CancelSignal) -> Self {
        Self { run_id, log, cancel }
    }

    fn info(&self, message: impl Into<String>) {
        (self.log)(LogEvent::info(self.run_id, message));
    }

    fn warn(&self, message: impl Into<String>) {
        (self.log)(LogEvent::warning(self.run_id, message));
    }

    fn progress(&self, step: &str, current: i64, total: i64, current_term: Option<String>) {
        (self.log)(LogEvent::info(self.run_id, format!("{step}: {current}/{total}")).with_progress(
            step,
            current,
            total,
            current_term,
        ));
    }

    /// Consulted before every stage, every LLM call, and every long loop
    /// iteration. Returns the [`PipelineError::Cancelled`] sentinel rather
    /// than a generic error so the finalizer can tell cancellation apart
    /// from failure.
    pub fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_set() {
            Err(PipelineError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Runs every stage `scope` names, in order. `full` is generate -> review ->
/// refine; extraction is never part of `full`.
pub fn dispatch_scope(
    ctx: &ExecutionContext,
    store: &SqliteStore,
    scope: RunScope,
    llm: &dyn LlmClient,
    noun_extractor: &dyn NounExtractor,
    batch_size: usize,
    doc_root: Option<&Path>,
) -> Result<()> {
    for stage in scope.stages() {
        ctx.check_cancelled()?;
        tracing::debug!(run_id = ctx.run_id, stage = %stage, "entering stage");
        match stage {
            Stage::Extract => run_extract(ctx, store, llm, noun_extractor, batch_size, doc_root)?,
            Stage::Generate => run_generate(ctx, store, llm)?,
            Stage::Review => run_review(ctx, store, llm, batch_size)?,
            Stage::Refine => run_refine(ctx, store, llm)?,
        }
        tracing::debug!(run_id = ctx.run_id, stage = %stage, "stage complete");
    }
    Ok(())
}

fn classification_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "terms": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "term": {"type": "string"},
                        "category": {"type": "string"},
                    },
                    "required": ["term", "category"],
                },
            },
        },
        "required": ["terms"],
    })
}

#[derive(serde::Deserialize)]
struct ClassifiedTerm {
    term: String,
    category: String,
}

#[derive(serde::Deserialize)]
struct ClassificationResponse {
    terms: Vec<ClassifiedTerm>,
}

/// *Extract.* Loads documents, tokenizes candidate nouns, classifies them in
/// batches, stores results, and auto-excludes common nouns. User notes on
/// existing extracted terms survive the destructive reset via a
/// backup/restore pair bracketing the rewrite.
pub fn run_extract(
    ctx: &ExecutionContext,
    store: &SqliteStore,
    llm: &dyn LlmClient,
    noun_extractor: &dyn NounExtractor,
    batch_size: usize,
    doc_root: Option<&Path>,
) -> Result<()> {
    ctx.check_cancelled()?;
    ctx.info("loading documents");
    let documents = load_documents(store, doc_root)?;

    let mut seen = std::collections::HashSet::new();
    let mut candidates = Vec::new();
    for document in &documents {
        for candidate in noun_extractor.extract(&document.content) {
            if seen.insert(candidate.clone()) {
                candidates.push(candidate);
            }
        }
    }
    ctx.info(format!("extracted {} candidate terms from {} documents", candidates.len(), documents.len()));

    let backup = store.backup_user_notes()?;
    store.clear_extracted_terms()?;

    let total_batches = candidates.len().div_ceil(batch_size.max(1));
    for (batch_index, chunk) in candidates.chunks(batch_size.max(1)).enumerate() {
        ctx.check_cancelled()?;
        ctx.progress("extract", (batch_index + 1) as i64, total_batches as i64, None);

        let list = chunk.iter().map(|c| format!("- {c}")).collect::<Vec<_>>().join("\n");
        let prompt = with_data_warning(format!(
            "Classify each candidate term below as a glossary-worthy noun or a COMMON_NOUN \
             (ordinary vocabulary not specific to this project's domain). Respond with one \
             entry per candidate.\n\n{}",
            envelope("candidates", &list)
        ));

        let response = llm.generate_structured(&prompt, &classification_schema())?;
        let parsed: ClassificationResponse = serde_json::from_value(response)
            .map_err(|e| PipelineError::Internal(format!("malformed classification response: {e}")))?;

        for term in parsed.terms {
            let normalized = term.term.trim().to_string();
            if normalized.is_empty() {
                continue;
            }
            store.insert_extracted_term(&normalized, Some(&term.category))?;
            if term.category.eq_ignore_ascii_case("COMMON_NOUN") {
                store.exclude_term(&normalized, TermSource::Auto)?;
            }
        }
    }

    store.restore_user_notes(&backup)?;
    ctx.info("extraction complete");
    Ok(())
}

#[derive(serde::Deserialize)]
struct DefinitionResponse {
    definition: String,
    confidence: f64,
}

fn definition_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "definition": {"type": "string"},
            "confidence": {"type": "number"},
        },
        "required": ["definition", "confidence"],
    })
}

/// *Generate.* For every active term (extracted minus excluded, plus
/// required), asks the LLM for a definition and confidence. A single term's
/// failure is logged and skipped rather than aborting the stage.
pub fn run_generate(ctx: &ExecutionContext, store: &SqliteStore, llm: &dyn LlmClient) -> Result<()> {
    ctx.check_cancelled()?;
    let terms = store.list_all_terms()?;
    let notes: HashMap<String, String> = store
        .list_extracted_terms()?
        .into_iter()
        .map(|t| (t.term_text, t.user_notes))
        .collect();

    let mut entries = Vec::new();
    let total = terms.len() as i64;
    for (index, term) in terms.iter().enumerate() {
        ctx.check_cancelled()?;
        ctx.progress("generate", index as i64 + 1, total, Some(term.term_text.clone()));

        let user_notes = notes.get(&term.term_text).map(String::as_str).unwrap_or("");
        let prompt = with_data_warning(format!(
            "Write a glossary definition for the following term, considering any user notes \
             provided. Estimate your confidence in the definition from 0.0 to 1.0.\n\n{}\n\n{}",
            envelope("term", &term.term_text),
            envelope("user_notes", user_notes),
        ));

        match llm.generate_structured(&prompt, &definition_schema()) {
            Ok(value) => match serde_json::from_value::<DefinitionResponse>(value) {
                Ok(parsed) => entries.push(GlossaryEntry {
                    id: 0,
                    term_name: term.term_text.clone(),
                    definition: parsed.definition,
                    confidence: parsed.confidence,
                    occurrences: Vec::<Occurrence>::new(),
                }),
                Err(e) => ctx.warn(format!("term {:?}: malformed definition response: {e}", term.term_text)),
            },
            Err(e) => ctx.warn(format!("term {:?}: generation failed: {e}", term.term_text)),
        }
    }

    store.replace_glossary(GlossaryStage::Provisional, &entries)?;
    ctx.info(format!("generated {} definitions", entries.len()));
    Ok(())
}

#[derive(serde::Deserialize)]
struct ReviewIssueResponse {
    term_name: String,
    issue_type: String,
    description: String,
    #[serde(default)]
    should_exclude: bool,
    #[serde(default)]
    exclusion_reason: Option<String>,
}

#[derive(serde::Deserialize)]
struct ReviewResponse {
    issues: Vec<ReviewIssueResponse>,
}

fn review_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "issues": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "term_name": {"type": "string"},
                        "issue_type": {"type": "string"},
                        "description": {"type": "string"},
                        "should_exclude": {"type": "boolean"},
                        "exclusion_reason": {"type": "string"},
                    },
                    "required": ["term_name", "issue_type", "description"],
                },
            },
        },
        "required": ["issues"],
    })
}

/// *Review.* Processes the provisional glossary in batches to stay within
/// context-window limits. A batch failure is logged and skipped; only
/// cancellation aborts the whole stage (and it does so before the partial
/// issue list is ever written -- the repository stores the full set in one
/// transaction after every batch has run).
pub fn run_review(ctx: &ExecutionContext, store: &SqliteStore, llm: &dyn LlmClient, batch_size: usize) -> Result<()> {
    let entries = store.list_glossary(GlossaryStage::Provisional)?;
    let mut issues = Vec::new();

    let batches: Vec<_> = entries.chunks(batch_size.max(1)).collect();
    let total_batches = batches.len() as i64;
    for (batch_index, batch) in batches.into_iter().enumerate() {
        ctx.check_cancelled()?;
        ctx.progress("review", batch_index as i64 + 1, total_batches, None);

        let batch_text = batch
            .iter()
            .map(|e| format!("- {}: {}", e.term_name, e.definition))
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = with_data_warning(format!(
            "Review the following glossary entries for contradictions, missing relations \
             between related terms, or entries that should be excluded as not domain-specific. \
             Return only genuine issues; an empty list means the batch is fine.\n\n{}",
            envelope("glossary", &batch_text)
        ));

        match llm.generate_structured(&prompt, &review_schema()) {
            Ok(value) => match serde_json::from_value::<ReviewResponse>(value) {
                Ok(parsed) => {
                    for issue in parsed.issues {
                        let issue_type = issue.issue_type.parse().unwrap_or(IssueType::Unclear);
                        issues.push(GlossaryIssue {
                            id: 0,
                            term_name: issue.term_name,
                            issue_type,
                            description: issue.description,
                            should_exclude: issue.should_exclude,
                            exclusion_reason: issue.exclusion_reason,
                        });
                    }
                }
                Err(e) => ctx.warn(format!("batch {batch_index}: malformed review response: {e}")),
            },
            Err(e) => ctx.warn(format!("batch {batch_index}: review call failed: {e}")),
        }
    }

    store.replace_glossary_issues(&issues)?;
    ctx.info(format!("review found {} issues", issues.len()));
    Ok(())
}

#[derive(serde::Deserialize)]
struct RefinementResponse {
    definition: String,
    confidence: f64,
}

fn refinement_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "definition": {"type": "string"},
            "confidence": {"type": "number"},
        },
        "required": ["definition", "confidence"],
    })
}

/// *Refine.* If review raised no issues, the provisional glossary is copied
/// verbatim. Otherwise every term with at least one issue is re-defined
/// with the issues and user notes as context; terms untouched by review
/// pass through unchanged.
pub fn run_refine(ctx: &ExecutionContext, store: &SqliteStore, llm: &dyn LlmClient) -> Result<()> {
    let issues = store.list_glossary_issues()?;
    if issues.is_empty() {
        ctx.info("no issues raised; copying provisional glossary verbatim");
        store.copy_provisional_to_refined()?;
        return Ok(());
    }

    let provisional = store.list_glossary(GlossaryStage::Provisional)?;
    let notes: HashMap<String, String> = store
        .list_extracted_terms()?
        .into_iter()
        .map(|t| (t.term_text, t.user_notes))
        .collect();

    let mut issues_by_term: HashMap<String, Vec<&GlossaryIssue>> = HashMap::new();
    for issue in &issues {
        issues_by_term.entry(issue.term_name.clone()).or_default().push(issue);
    }

    let mut refined = Vec::new();
    let total = provisional.len() as i64;
    for (index, entry) in provisional.iter().enumerate() {
        ctx.check_cancelled()?;

        let Some(term_issues) = issues_by_term.get(&entry.term_name) else {
            refined.push(entry.clone());
            continue;
        };
        ctx.progress("refine", index as i64 + 1, total, Some(entry.term_name.clone()));

        let issues_text = term_issues
            .iter()
            .map(|i| format!("- [{}] {}", i.issue_type, i.description))
            .collect::<Vec<_>>()
            .join("\n");
        let user_notes = notes.get(&entry.term_name).map(String::as_str).unwrap_or("");
        let prompt = with_data_warning(format!(
            "Revise the following glossary definition to address the listed issues, taking \
             any user notes into account.\n\n{}\n\n{}\n\n{}",
            envelope("glossary", &entry.definition),
            envelope("refinement", &issues_text),
            envelope("user_notes", user_notes),
        ));

        match llm.generate_structured(&prompt, &refinement_schema()) {
            Ok(value) => match serde_json::from_value::<RefinementResponse>(value) {
                Ok(parsed) => refined.push(GlossaryEntry {
                    id: 0,
                    term_name: entry.term_name.clone(),
                    definition: parsed.definition,
                    confidence: parsed.confidence,
                    occurrences: entry.occurrences.clone(),
                }),
                Err(e) => {
                    ctx.warn(format!("term {:?}: malformed refinement response: {e}", entry.term_name));
                    refined.push(entry.clone());
                }
            },
            Err(e) => {
                ctx.warn(format!("term {:?}: refinement call failed: {e}", entry.term_name));
                refined.push(entry.clone());
            }
        }
    }

    store.replace_glossary(GlossaryStage::Refined, &refined)?;
    ctx.info(format!("refined {} entries ({} had issues)", refined.len(), issues_by_term.len()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use genglossary_llm::MockLlmClient;
    use std::sync::Mutex;

    fn silent_ctx() -> ExecutionContext {
        ExecutionContext::new(1, Arc::new(|_event| {}), CancelSignal::new())
    }

    fn recording_ctx() -> (ExecutionContext, Arc<Mutex<Vec<LogEvent>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let ctx = ExecutionContext::new(1, Arc::new(move |event| sink.lock().unwrap().push(event)), CancelSignal::new());
        (ctx, events)
    }

    #[test]
    fn generate_is_resilient_to_a_single_term_failure() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert_extracted_term("widget", None).unwrap();
        store.insert_extracted_term("gadget", None).unwrap();

        let llm = MockLlmClient::new();
        llm.fail_when_prompt_contains("widget");
        llm.set_default_structured(json!({"definition": "a small mechanism", "confidence": 0.8}));

        let (ctx, events) = recording_ctx();
        run_generate(&ctx, &store, &llm).unwrap();

        let entries = store.list_glossary(GlossaryStage::Provisional).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].term_name, "gadget");
        assert!(events.lock().unwrap().iter().any(|e| e.level == genglossary_core::enums::LogLevel::Warning));
    }

    #[test]
    fn review_returns_cancelled_sentinel_before_any_write() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert_glossary_entry(GlossaryStage::Provisional, "widget", "def", 0.9, &[]).unwrap();
        store
            .insert_glossary_issue(&GlossaryIssue {
                id: 0,
                term_name: "stale".into(),
                issue_type: IssueType::Unclear,
                description: "pre-existing".into(),
                should_exclude: false,
                exclusion_reason: None,
            })
            .unwrap();

        let llm = MockLlmClient::new();
        let cancel = CancelSignal::new();
        cancel.set();
        let ctx = ExecutionContext::new(1, Arc::new(|_| {}), cancel);

        let result = run_review(&ctx, &store, &llm, DEFAULT_BATCH_SIZE);
        assert!(matches!(result, Err(PipelineError::Cancelled)));

        // The pre-existing issue must still be there: cancellation happened
        // before replace_glossary_issues was ever called.
        let issues = store.list_glossary_issues().unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].term_name, "stale");
    }

    #[test]
    fn review_empty_result_is_distinct_from_cancellation() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert_glossary_entry(GlossaryStage::Provisional, "widget", "def", 0.9, &[]).unwrap();

        let llm = MockLlmClient::new();
        llm.set_default_structured(json!({"issues": []}));

        let ctx = silent_ctx();
        run_review(&ctx, &store, &llm, DEFAULT_BATCH_SIZE).unwrap();
        assert!(store.list_glossary_issues().unwrap().is_empty());
    }

    #[test]
    fn refine_copies_provisional_verbatim_when_no_issues() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert_glossary_entry(GlossaryStage::Provisional, "widget", "a gadget", 0.9, &[]).unwrap();

        let llm = MockLlmClient::new();
        let ctx = silent_ctx();
        run_refine(&ctx, &store, &llm).unwrap();

        let refined = store.list_glossary(GlossaryStage::Refined).unwrap();
        assert_eq!(refined.len(), 1);
        assert_eq!(refined[0].definition, "a gadget");
        assert!(llm.recorded_calls().is_empty());
    }

    #[test]
    fn refine_passes_through_terms_without_issues() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert_glossary_entry(GlossaryStage::Provisional, "widget", "def1", 0.9, &[]).unwrap();
        store.insert_glossary_entry(GlossaryStage::Provisional, "gadget", "def2", 0.8, &[]).unwrap();
        store
            .insert_glossary_issue(&GlossaryIssue {
                id: 0,
                term_name: "widget".into(),
                issue_type: IssueType::Contradiction,
                description: "conflicts".into(),
                should_exclude: false,
                exclusion_reason: None,
            })
            .unwrap();

        let llm = MockLlmClient::new();
        llm.set_default_structured(json!({"definition": "revised def1", "confidence": 0.95}));

        let ctx = silent_ctx();
        run_refine(&ctx, &store, &llm).unwrap();

        let refined = store.list_glossary(GlossaryStage::Refined).unwrap();
        let widget = refined.iter().find(|e| e.term_name == "widget").unwrap();
        let gadget = refined.iter().find(|e| e.term_name == "gadget").unwrap();
        assert_eq!(widget.definition, "revised def1");
        assert_eq!(gadget.definition, "def2");
    }

    #[test]
    fn extract_auto_excludes_common_nouns() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.upsert_document_by_path("doc.md", "widget thing").unwrap();

        struct FixedExtractor;
        impl NounExtractor for FixedExtractor {
            fn extract(&self, _text: &str) -> Vec<String> {
                vec!["widget".into(), "thing".into()]
            }
        }

        let llm = MockLlmClient::new();
        llm.set_default_structured(json!({
            "terms": [
                {"term": "widget", "category": "component"},
                {"term": "thing", "category": "COMMON_NOUN"},
            ]
        }));

        let ctx = silent_ctx();
        run_extract(&ctx, &store, &llm, &FixedExtractor, DEFAULT_BATCH_SIZE, None).unwrap();

        let excluded = store.list_excluded_terms().unwrap();
        assert!(excluded.iter().any(|t| t.term_text == "thing"));
        assert!(!excluded.iter().any(|t| t.term_text == "widget"));
    }

    #[test]
    fn extract_restores_user_notes_after_destructive_reset() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert_extracted_term("widget", None).unwrap();
        store
            .restore_user_notes(&HashMap::from([("widget".to_string(), "keep me".to_string())]))
            .unwrap();
        store.upsert_document_by_path("doc.md", "widget").unwrap();

        struct FixedExtractor;
        impl NounExtractor for FixedExtractor {
            fn extract(&self, _text: &str) -> Vec<String> {
                vec!["widget".into()]
            }
        }

        let llm = MockLlmClient::new();
        llm.set_default_structured(json!({"terms": [{"term": "widget", "category": "component"}]}));

        let ctx = silent_ctx();
        run_extract(&ctx, &store, &llm, &FixedExtractor, DEFAULT_BATCH_SIZE, None).unwrap();

        let terms = store.list_extracted_terms().unwrap();
        assert_eq!(terms[0].user_notes, "keep me");
    }
}
