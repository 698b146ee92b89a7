//! Layered configuration and data-directory discovery for genglossary.
//!
//! This crate handles loading and saving `~/.genglossary/config.yaml`,
//! locating the genglossary data directory, and providing typed access to
//! configuration values shared by the CLI and HTTP boundary.

pub mod config;
pub mod data_dir;

pub use config::{AppConfig, ConfigError, ConfigOverrides, LlmDefaults};
