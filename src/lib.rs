//! doctr - A CLI tool that generates documentation from git diffs.
//!
//! # Overview
//!
//! doctr parses the unified diff for a revision expression into a
//! [`ChangeSet`](diff::ChangeSet), optionally asks an LLM provider for a
//! structured analysis, and writes a single Markdown or MDX document. It can
//! also scan a whole project into a multi-page wiki.

pub mod config;
pub mod diff;
pub mod docs;
pub mod error;
pub mod llm;
pub mod wiki;

// Re-export commonly used types
pub use config::{Config, IgnoreMatcher, OutputFormat};
pub use diff::{ChangeKind, ChangeSet, FileChange, LineEdit, parse_unified_diff};
pub use error::{ConfigError, DiffError, GenerateError, LlmError, WikiError, WriteError};
pub use llm::{Enhancement, UnavailableReason};
