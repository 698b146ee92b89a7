//! Run manager, log bus, and stage executor driving the glossary pipeline.
//!
//! This crate is intentionally synchronous: every stage is a blocking call
//! into [`genglossary_storage`] and [`genglossary_llm`], and a run executes
//! on its own dedicated [`std::thread`]. The HTTP boundary bridges into this
//! world with `tokio::task::spawn_blocking`; nothing in here depends on an
//! async runtime.

pub mod documents;
pub mod error;
pub mod executor;
pub mod log_bus;
pub mod noun_extractor;
pub mod prompt;
pub mod run_manager;

pub use error::{PipelineError, Result};
pub use executor::{CancelSignal, ExecutionContext};
pub use log_bus::{LogBus, LogEvent, Subscription};
pub use noun_extractor::{NounExtractor, SimpleNounExtractor};
pub use run_manager::{RunManager, RunManagerConfig};
