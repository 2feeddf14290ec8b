//! Error types for doctr modules using thiserror.

use std::path::PathBuf;

use thiserror::Error;

use crate::llm::Provider;

/// Errors from diff collection and parsing.
#[derive(Error, Debug)]
pub enum DiffError {
    #[error("Failed to open repository: {0}")]
    OpenRepository(#[source] git2::Error),

    #[error("Failed to resolve diff target '{0}': {1}")]
    TargetNotFound(String, #[source] git2::Error),

    #[error("Failed to compute diff: {0}")]
    DiffFailed(#[source] git2::Error),

    #[error("Failed to read diff input: {0}")]
    ReadFailed(#[source] std::io::Error),

    #[error("Malformed diff at line {line}: {reason}")]
    Malformed { line: usize, reason: String },
}

impl DiffError {
    pub(crate) fn malformed(line: usize, reason: impl Into<String>) -> Self {
        DiffError::Malformed {
            line,
            reason: reason.into(),
        }
    }
}

/// Errors from LLM provider calls.
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("No LLM credentials found. Set ANTHROPIC_API_KEY or OPENAI_API_KEY to enable AI enhancement")]
    MissingCredentials,

    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    #[error("Request to {provider} failed: {source}")]
    RequestFailed {
        provider: Provider,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} request timed out after {secs} seconds")]
    Timeout { provider: Provider, secs: u64 },

    #[error("{provider} rejected the API key (HTTP {status}). Check {}", provider.env_var())]
    Unauthorized { provider: Provider, status: u16 },

    #[error("{provider} rate limited the request{}", retry_after.as_ref().map(|s| format!(" (retry after {s}s)")).unwrap_or_default())]
    RateLimited {
        provider: Provider,
        retry_after: Option<String>,
    },

    #[error("{provider} returned HTTP {status}: {body}")]
    Api {
        provider: Provider,
        status: u16,
        body: String,
    },

    #[error("{provider} returned an empty response")]
    EmptyResponse { provider: Provider },

    #[error("{provider} returned unparseable output: {message}")]
    InvalidResponse { provider: Provider, message: String },
}

/// Errors from configuration loading and initialization.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ParseFailed {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    InvalidValue(#[source] toml::de::Error),

    #[error("Invalid ignore pattern '{pattern}': {source}")]
    InvalidIgnorePattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("Configuration already exists: {0}. Use --force to overwrite.")]
    AlreadyExists(PathBuf),

    #[error("Failed to write config file: {0}")]
    WriteFailed(#[source] std::io::Error),
}

/// Errors from writing documentation files.
#[derive(Error, Debug)]
pub enum WriteError {
    #[error("Failed to create output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to replace {path}: {source}")]
    PersistFailed {
        path: PathBuf,
        #[source]
        source: tempfile::PersistError,
    },
}

/// Errors from project wiki generation.
#[derive(Error, Debug)]
pub enum WikiError {
    #[error("Project root {0} is not a directory")]
    NotADirectory(PathBuf),

    #[error("Failed to walk project tree: {0}")]
    WalkFailed(#[source] ignore::Error),

    #[error(transparent)]
    Write(#[from] WriteError),
}

/// Errors from the change documentation pipeline.
#[derive(Error, Debug)]
pub enum GenerateError {
    #[error(transparent)]
    Diff(#[from] DiffError),

    #[error(transparent)]
    Write(#[from] WriteError),
}
