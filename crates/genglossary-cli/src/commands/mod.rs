//! Command handlers, one module per subcommand group.

pub mod completion;
pub mod config;
pub mod doc;
pub mod glossary;
pub mod project;
pub mod run;
pub mod term;
