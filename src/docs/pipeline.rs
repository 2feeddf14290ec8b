//! The `generate` pipeline: parse, draft, enhance once, render, write.

use std::path::PathBuf;

use chrono::Utc;
use tracing::{debug, info};

use crate::config::{IgnoreMatcher, OutputFormat};
use crate::diff::{ChangeSet, parse_unified_diff};
use crate::error::GenerateError;
use crate::llm::{CompletionClient, Enhancement, UnavailableReason, enhance};

use super::draft::{DocumentationDraft, DraftOptions};
use super::render::Document;
use super::writer::{filename_for_target, write_document};

/// Settings for one `generate` run.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Free-form revision expression, used for the file name and metadata.
    pub diff_target: String,
    pub output_dir: PathBuf,
    pub format: OutputFormat,
    pub draft: DraftOptions,
    /// Render but do not write.
    pub dry_run: bool,
}

/// Result of a `generate` run.
#[derive(Debug)]
pub enum GenerateOutcome {
    /// The diff had no (non-ignored) file changes; nothing was written.
    NoChanges,
    Written {
        path: PathBuf,
        files: usize,
        enhancement: Enhancement,
    },
    DryRun {
        file_name: String,
        content: String,
        files: usize,
        enhancement: Enhancement,
    },
}

/// Turn diff text into one documentation file.
///
/// The diff is parsed before any provider call, so malformed input aborts the
/// run without contacting the model. Provider failures never abort: they
/// yield a structure-only document and are reported through the outcome.
pub async fn generate_change_docs(
    diff_text: &str,
    ignore: &IgnoreMatcher,
    options: &GenerateOptions,
    client: Result<&dyn CompletionClient, UnavailableReason>,
) -> Result<GenerateOutcome, GenerateError> {
    let parsed = parse_unified_diff(diff_text)?;
    let total = parsed.len();
    let changes = parsed.without_ignored(ignore);
    if changes.len() < total {
        debug!("Ignored {} file(s) by pattern", total - changes.len());
    }

    if changes.is_empty() {
        return Ok(GenerateOutcome::NoChanges);
    }

    let draft = DocumentationDraft::new(&changes, &options.diff_target, options.draft, Utc::now());
    let enhancement = enhance(client, &changes, &draft).await;
    let content = render_document(&draft, &changes, &enhancement, options.format);
    let file_name = filename_for_target(&options.diff_target, options.format);

    if options.dry_run {
        return Ok(GenerateOutcome::DryRun {
            file_name,
            content,
            files: changes.len(),
            enhancement,
        });
    }

    let path = write_document(&options.output_dir, &file_name, &content)?;
    info!("Documented {} file change(s) in {}", changes.len(), path.display());

    Ok(GenerateOutcome::Written {
        path,
        files: changes.len(),
        enhancement,
    })
}

/// Render the document matching the enhancement outcome.
pub fn render_document(
    draft: &DocumentationDraft,
    changes: &ChangeSet,
    enhancement: &Enhancement,
    format: OutputFormat,
) -> String {
    let document = match enhancement {
        Enhancement::Generated(content) => Document::enhanced(draft, changes, content),
        Enhancement::Unavailable(reason) => Document::structure_only(draft, changes, reason),
    };
    document.render(format)
}
