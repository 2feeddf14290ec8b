//! Glob-based ignore patterns for diff paths and project scanning.

use std::path::Path;

use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::error::ConfigError;

/// Compiled set of ignore patterns.
///
/// Patterns are matched against repository-relative paths with `/`
/// separators. A pattern without a leading `/` also matches below any
/// directory, so `__pycache__/*` skips `pkg/__pycache__/mod.pyc`. A leading
/// `/` anchors the pattern to the repository root.
#[derive(Debug, Clone)]
pub struct IgnoreMatcher {
    set: GlobSet,
    patterns: Vec<String>,
}

impl IgnoreMatcher {
    pub fn new(patterns: &[String]) -> Result<Self, ConfigError> {
        let mut builder = GlobSetBuilder::new();
        let mut kept = Vec::new();

        for raw in patterns {
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            for expanded in expand_pattern(trimmed) {
                let glob = Glob::new(&expanded).map_err(|source| {
                    ConfigError::InvalidIgnorePattern {
                        pattern: raw.clone(),
                        source,
                    }
                })?;
                builder.add(glob);
            }
            kept.push(trimmed.to_string());
        }

        let set = builder
            .build()
            .map_err(|source| ConfigError::InvalidIgnorePattern {
                pattern: kept.join(", "),
                source,
            })?;

        Ok(Self {
            set,
            patterns: kept,
        })
    }

    /// A matcher that ignores nothing.
    pub fn empty() -> Self {
        Self {
            set: GlobSet::empty(),
            patterns: Vec::new(),
        }
    }

    pub fn is_ignored(&self, path: &str) -> bool {
        let path = path.trim_start_matches("./");
        !path.is_empty() && self.set.is_match(path)
    }

    pub fn is_ignored_path(&self, path: &Path) -> bool {
        self.is_ignored(&path.to_string_lossy().replace('\\', "/"))
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}

fn expand_pattern(pattern: &str) -> Vec<String> {
    if let Some(anchored) = pattern.strip_prefix('/') {
        return vec![anchored.to_string()];
    }
    if pattern.starts_with("**") {
        return vec![pattern.to_string()];
    }
    vec![pattern.to_string(), format!("**/{pattern}")]
}
