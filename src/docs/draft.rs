//! Structured documentation draft derived from a change set.

use chrono::{DateTime, Utc};

use crate::config::Config;
use crate::diff::{ChangeKind, ChangeSet};

/// Which optional sections to suggest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DraftOptions {
    pub include_usage_examples: bool,
    pub include_migration_guide: bool,
    pub include_changelog: bool,
}

impl Default for DraftOptions {
    fn default() -> Self {
        Self {
            include_usage_examples: true,
            include_migration_guide: true,
            include_changelog: true,
        }
    }
}

impl From<&Config> for DraftOptions {
    fn from(config: &Config) -> Self {
        Self {
            include_usage_examples: config.include_usage_examples,
            include_migration_guide: config.include_migration_guide,
            include_changelog: config.include_changelog,
        }
    }
}

/// Facts about the change set recorded alongside the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftMetadata {
    pub files_changed: usize,
    /// Number of hunks across all files.
    pub total_changes: usize,
    /// Change kinds in first-seen order.
    pub change_kinds: Vec<ChangeKind>,
    pub lines_added: u32,
    pub lines_removed: u32,
    pub diff_target: String,
    pub generated_at: DateTime<Utc>,
}

/// Title, summary and outline of a change document before rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentationDraft {
    pub title: String,
    pub summary: String,
    /// Unique hunk section texts (usually enclosing function signatures).
    pub affected_symbols: Vec<String>,
    pub sections: Vec<String>,
    pub metadata: DraftMetadata,
}

impl DocumentationDraft {
    pub fn new(
        changes: &ChangeSet,
        diff_target: &str,
        options: DraftOptions,
        generated_at: DateTime<Utc>,
    ) -> Self {
        let counts = changes.count_by_kind();
        let affected_symbols = affected_symbols(changes);

        let metadata = DraftMetadata {
            files_changed: changes.len(),
            total_changes: changes.iter().map(|f| f.edits.len()).sum(),
            change_kinds: counts.iter().map(|(kind, _)| *kind).collect(),
            lines_added: changes.lines_added(),
            lines_removed: changes.lines_removed(),
            diff_target: diff_target.to_string(),
            generated_at,
        };

        if changes.is_empty() {
            return Self {
                title: "No Changes".to_string(),
                summary: "No code changes detected.".to_string(),
                affected_symbols,
                sections: Vec::new(),
                metadata,
            };
        }

        let title = match changes.files() {
            [only] => format!("Changes to {}", only.file_name()),
            files => format!("Changes across {} files", files.len()),
        };

        let sections = suggest_sections(&counts, !affected_symbols.is_empty(), options);

        Self {
            title,
            summary: summarize(&counts),
            affected_symbols,
            sections,
            metadata,
        }
    }
}

fn summarize(counts: &[(ChangeKind, usize)]) -> String {
    let parts: Vec<String> = counts
        .iter()
        .map(|(kind, count)| {
            let noun = if *count == 1 { "change" } else { "changes" };
            format!("{} {} {}", count, kind, noun)
        })
        .collect();

    format!("This update includes {}.", parts.join(", "))
}

fn affected_symbols(changes: &ChangeSet) -> Vec<String> {
    let mut symbols: Vec<String> = Vec::new();
    for edit in changes.iter().flat_map(|f| &f.edits) {
        if let Some(section) = &edit.section {
            if !symbols.contains(section) {
                symbols.push(section.clone());
            }
        }
    }
    symbols
}

fn suggest_sections(
    counts: &[(ChangeKind, usize)],
    has_symbols: bool,
    options: DraftOptions,
) -> Vec<String> {
    let mut sections = vec!["Overview".to_string()];

    if counts
        .iter()
        .any(|(kind, _)| matches!(kind, ChangeKind::Added | ChangeKind::Modified))
    {
        sections.push("New Features".to_string());
    }
    if has_symbols {
        sections.push("API Changes".to_string());
    }
    if options.include_usage_examples {
        sections.push("Usage Examples".to_string());
    }
    if options.include_migration_guide {
        sections.push("Migration Guide".to_string());
    }
    if options.include_changelog {
        sections.push("Changelog".to_string());
    }

    sections
}
