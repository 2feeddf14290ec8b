//! Prompt construction for change documentation and wiki pages.

use crate::diff::{ChangeSet, FileChange};
use crate::docs::DocumentationDraft;
use crate::wiki::{ProjectStructure, WikiPage};

/// Characters of added or removed content included per file.
pub const MAX_FILE_CHARS: usize = 4_000;

/// Upper bound on the change listing in a prompt.
pub const MAX_PROMPT_CHARS: usize = 60_000;

/// Tokens requested for a reply.
pub const MAX_REPLY_TOKENS: u32 = 4_096;

pub const CHANGE_SYSTEM_PROMPT: &str = "You are an expert technical writer and software engineer. \
You analyze code changes and document their user-facing impact: what changed, why it matters, \
breaking changes, and whether usage examples or a migration guide are needed. \
You answer with a single JSON object and nothing else.";

pub const WIKI_SYSTEM_PROMPT: &str = "You are an expert technical writer. You write clear, \
accurate project documentation in Markdown for developers of all experience levels. \
You only describe what the provided project facts support.";

const RESPONSE_FORMAT: &str = r#"Respond with ONLY a JSON object in this exact format:
{
  "summary": "One or two sentences describing the purpose of these changes",
  "impact_level": "minor" | "moderate" | "major",
  "affected_components": ["component or module names"],
  "breaking_changes": ["each breaking change, empty if none"],
  "new_features": ["each new feature or capability"],
  "bug_fixes": ["each bug fixed"],
  "documentation_sections": ["section headings the document covers"],
  "usage_examples_needed": true | false,
  "migration_guide_needed": true | false,
  "document": "The full documentation body in Markdown, without a top-level title"
}"#;

/// Neutralize text before embedding it in a prompt.
///
/// Strips control characters other than newlines and tabs, and replaces
/// triple backticks so embedded content cannot close the prompt's fences.
pub fn sanitize_for_prompt(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect::<String>()
        .replace("```", "'''")
}

/// Build the prompt asking for a structured analysis of `changes`.
pub fn build_change_prompt(changes: &ChangeSet, draft: &DocumentationDraft) -> String {
    let mut prompt = String::from("Analyze these code changes and document them.\n\n");

    prompt.push_str(&format!(
        "Diff target: {}\n",
        sanitize_for_prompt(&draft.metadata.diff_target)
    ));
    prompt.push_str(&format!("Summary: {}\n", draft.summary));
    prompt.push_str(&format!(
        "Files changed: {} (+{} / -{} lines)\n",
        draft.metadata.files_changed, draft.metadata.lines_added, draft.metadata.lines_removed
    ));
    if !draft.affected_symbols.is_empty() {
        let symbols: Vec<String> = draft
            .affected_symbols
            .iter()
            .map(|s| sanitize_for_prompt(s))
            .collect();
        prompt.push_str(&format!("Affected symbols: {}\n", symbols.join("; ")));
    }
    prompt.push('\n');

    let listing_start = prompt.len();
    let total = changes.len();
    for (idx, change) in changes.iter().enumerate() {
        let section = describe_change(idx + 1, change);
        if prompt.len() - listing_start + section.len() > MAX_PROMPT_CHARS {
            prompt.push_str(&format!(
                "[{} more file(s) omitted to fit the prompt size limit]\n\n",
                total - idx
            ));
            break;
        }
        prompt.push_str(&section);
    }

    prompt.push_str("Consider:\n");
    prompt.push_str("1. What is the overall purpose of these changes?\n");
    prompt.push_str("2. What components or modules are affected?\n");
    prompt.push_str("3. Are there any breaking changes?\n");
    prompt.push_str("4. What new features or capabilities are introduced?\n");
    prompt.push_str("5. What bugs are being fixed?\n\n");

    if !draft.sections.is_empty() {
        prompt.push_str(&format!(
            "Organize the document with these sections where they apply: {}.\n",
            draft.sections.join(", ")
        ));
    }
    if draft.sections.iter().any(|s| s == "Usage Examples") {
        prompt.push_str("Include practical usage examples for new or changed behavior.\n");
    }
    if draft.sections.iter().any(|s| s == "Migration Guide") {
        prompt.push_str("Include a migration guide if there are breaking changes.\n");
    }
    prompt.push('\n');
    prompt.push_str(RESPONSE_FORMAT);

    prompt
}

fn describe_change(number: usize, change: &FileChange) -> String {
    let mut out = format!("## Change {}: {}\n", number, sanitize_for_prompt(&change.path));
    out.push_str(&format!("Type: {}\n", change.kind));

    if let Some(old) = &change.old_path {
        out.push_str(&format!("Old path: {}\n", sanitize_for_prompt(old)));
    }

    let ranges: Vec<String> = change
        .edits
        .iter()
        .filter_map(|e| e.new_range())
        .map(|(start, end)| format!("{start}-{end}"))
        .collect();
    if !ranges.is_empty() {
        out.push_str(&format!("Lines: {}\n", ranges.join(", ")));
    }

    let functions: Vec<&str> = change
        .edits
        .iter()
        .filter_map(|e| e.section.as_deref())
        .collect();
    if !functions.is_empty() {
        out.push_str(&format!("Context: {}\n", sanitize_for_prompt(&functions.join("; "))));
    }

    if change.binary {
        out.push_str("Binary file, content not shown.\n\n");
        return out;
    }

    let removed: Vec<&str> = change
        .edits
        .iter()
        .flat_map(|e| e.removed_text.iter().map(String::as_str))
        .collect();
    let added: Vec<&str> = change
        .edits
        .iter()
        .flat_map(|e| e.added_text.iter().map(String::as_str))
        .collect();

    if !removed.is_empty() {
        out.push_str("### Old Content:\n");
        push_fenced(&mut out, &removed.join("\n"));
    }
    if !added.is_empty() {
        out.push_str("### New Content:\n");
        push_fenced(&mut out, &added.join("\n"));
    }

    out.push('\n');
    out
}

fn push_fenced(out: &mut String, content: &str) {
    let sanitized = sanitize_for_prompt(content);
    let (body, omitted) = truncate_chars(&sanitized, MAX_FILE_CHARS);
    out.push_str("```\n");
    out.push_str(body);
    out.push_str("\n```\n");
    if omitted > 0 {
        out.push_str(&format!("[... {} more characters truncated]\n", omitted));
    }
}

/// Cut `text` to at most `max` characters, returning the kept prefix and the
/// number of characters dropped.
fn truncate_chars(text: &str, max: usize) -> (&str, usize) {
    match text.char_indices().nth(max) {
        Some((byte_idx, _)) => (&text[..byte_idx], text[byte_idx..].chars().count()),
        None => (text, 0),
    }
}

/// Build the prompt for one wiki page.
///
/// The structure-only rendering of the page is included as the factual
/// baseline the model should expand on.
pub fn build_wiki_prompt(page: &WikiPage, structure: &ProjectStructure) -> String {
    let overview = sanitize_for_prompt(&structure.overview());
    let (overview, _) = truncate_chars(&overview, MAX_PROMPT_CHARS / 2);
    let baseline = sanitize_for_prompt(&page.content);
    let (baseline, _) = truncate_chars(&baseline, MAX_PROMPT_CHARS / 2);

    format!(
        r##"Write the "{title}" page of the project wiki for {project}.

PROJECT FACTS:
{overview}

DRAFT PAGE (generated from the file tree):
{baseline}

Rewrite and expand the draft into a complete wiki page. Keep every fact from the
draft that is still accurate, explain how the pieces fit together, and add
practical examples where the facts support them. Do not invent commands, files
or APIs that are not listed above.

Respond with ONLY the Markdown content of the page, starting with "# {title}"."##,
        title = page.title,
        project = sanitize_for_prompt(&structure.name),
    )
}
