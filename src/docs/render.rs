//! Rendering drafts and AI content into Markdown or MDX.

use serde_json::{Value, json};

use crate::config::OutputFormat;
use crate::diff::{ChangeKind, ChangeSet, FileChange};
use crate::llm::{DocAnalysis, GeneratedContent, UnavailableReason};

use super::draft::DocumentationDraft;

/// Lines of added content shown per file in a structure-only document.
const EXCERPT_LINES: usize = 20;

/// A titled document with metadata, ready to be rendered.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub title: String,
    pub body: String,
    /// Closing remark, escaped per output format when rendered.
    pub notice: Option<String>,
    pub metadata: Vec<(String, Value)>,
}

impl Document {
    /// Document built from the diff structure alone.
    pub fn structure_only(
        draft: &DocumentationDraft,
        changes: &ChangeSet,
        reason: &UnavailableReason,
    ) -> Self {
        let mut body = format!("## Summary\n\n{}\n\n", draft.summary);
        body.push_str(&change_list(changes));
        push_bullets(&mut body, "Affected Symbols", &code_items(&draft.affected_symbols));
        push_bullets(&mut body, "Suggested Sections", &draft.sections);
        let notice = format!(
            "Structure-only document: {}.",
            reason.to_string().trim_end_matches('.')
        );

        let mut metadata = draft_metadata(draft);
        metadata.push(("enhanced".to_string(), json!(false)));
        metadata.push(("ai_status".to_string(), json!(reason.to_string())));

        Self {
            title: draft.title.clone(),
            body,
            notice: Some(notice),
            metadata,
        }
    }

    /// Document whose body comes from the model.
    pub fn enhanced(
        draft: &DocumentationDraft,
        changes: &ChangeSet,
        content: &GeneratedContent,
    ) -> Self {
        let analysis = &content.analysis;
        let document = strip_title(&analysis.document);

        let mut body = if document.trim().is_empty() {
            let mut fallback = format!("## Summary\n\n{}\n\n", analysis.summary.trim());
            fallback.push_str(&change_list(changes));
            fallback
        } else {
            format!("{}\n\n", document.trim())
        };
        body.push_str(&analysis_appendix(analysis));

        let mut metadata = draft_metadata(draft);
        metadata.push(("enhanced".to_string(), json!(true)));
        metadata.push(("provider".to_string(), json!(content.provider.as_str())));
        metadata.push(("model".to_string(), json!(content.model)));
        metadata.push(("impact_level".to_string(), json!(analysis.impact_level.as_str())));

        Self {
            title: draft.title.clone(),
            body,
            notice: None,
            metadata,
        }
    }

    /// Render as Markdown (trailing HTML comment) or MDX (YAML front matter).
    pub fn render(&self, format: OutputFormat) -> String {
        match format {
            OutputFormat::Markdown => self.render_markdown(),
            OutputFormat::Mdx => self.render_mdx(),
        }
    }

    fn render_markdown(&self) -> String {
        let mut out = format!("# {}\n\n{}", self.title, self.body.trim_end());
        if let Some(notice) = &self.notice {
            out.push_str(&format!("\n\n> {}", single_line(notice)));
        }
        if !self.metadata.is_empty() {
            out.push_str("\n\n<!-- Metadata:\n");
            for (key, value) in &self.metadata {
                out.push_str(&format!("{}: {}\n", key, comment_safe(&plain_value(value))));
            }
            out.push_str("-->");
        }
        out.push('\n');
        out
    }

    fn render_mdx(&self) -> String {
        let mut out = String::from("---\n");
        out.push_str(&format!("title: {}\n", json!(self.title)));
        for (key, value) in &self.metadata {
            // JSON scalars and arrays are valid YAML flow values.
            out.push_str(&format!("{}: {}\n", key, value));
        }
        out.push_str("---\n\n");
        out.push_str(&format!("# {}\n\n{}\n", mdx_text(&self.title), self.body.trim_end()));
        if let Some(notice) = &self.notice {
            out.push_str(&format!("\n> {}\n", mdx_text(&single_line(notice))));
        }
        out
    }
}

fn draft_metadata(draft: &DocumentationDraft) -> Vec<(String, Value)> {
    let meta = &draft.metadata;
    let kinds: Vec<&str> = meta.change_kinds.iter().map(ChangeKind::as_str).collect();
    vec![
        ("files_changed".to_string(), json!(meta.files_changed)),
        ("total_changes".to_string(), json!(meta.total_changes)),
        ("change_kinds".to_string(), json!(kinds)),
        ("lines_added".to_string(), json!(meta.lines_added)),
        ("lines_removed".to_string(), json!(meta.lines_removed)),
        ("diff_target".to_string(), json!(meta.diff_target)),
        ("generated_at".to_string(), json!(meta.generated_at.to_rfc3339())),
    ]
}

fn change_list(changes: &ChangeSet) -> String {
    let mut out = String::from("## Changes\n\n");
    for change in changes {
        out.push_str(&describe_file(change));
    }
    out
}

fn describe_file(change: &FileChange) -> String {
    let heading = match &change.old_path {
        Some(old) => format!("### `{}` → `{}` ({})\n\n", old, change.path, change.kind),
        None => format!("### `{}` ({})\n\n", change.path, change.kind),
    };
    let mut out = heading;

    if change.binary {
        out.push_str("- Binary file\n\n");
        return out;
    }

    let ranges: Vec<String> = change
        .edits
        .iter()
        .filter_map(|e| e.new_range())
        .map(|(start, end)| {
            if start == end {
                format!("{start}")
            } else {
                format!("{start}-{end}")
            }
        })
        .collect();
    if !ranges.is_empty() {
        out.push_str(&format!("- Lines: {}\n", ranges.join(", ")));
    }
    out.push_str(&format!(
        "- +{} / -{} lines\n\n",
        change.lines_added(),
        change.lines_removed()
    ));

    let added: Vec<&str> = change
        .edits
        .iter()
        .flat_map(|e| e.added_text.iter().map(String::as_str))
        .collect();
    if !added.is_empty() {
        let shown = &added[..added.len().min(EXCERPT_LINES)];
        out.push_str(&fenced(&shown.join("\n")));
        if added.len() > EXCERPT_LINES {
            out.push_str(&format!(
                "_{} more added line(s) not shown._\n\n",
                added.len() - EXCERPT_LINES
            ));
        }
    }

    out
}

fn analysis_appendix(analysis: &DocAnalysis) -> String {
    let mut out = String::from("## Analysis\n\n");
    out.push_str(&format!("- **Impact:** {}\n", analysis.impact_level));
    if !analysis.affected_components.is_empty() {
        out.push_str(&format!(
            "- **Affected components:** {}\n",
            analysis.affected_components.join(", ")
        ));
    }
    out.push('\n');

    push_subsection(&mut out, "Breaking Changes", &analysis.breaking_changes);
    push_subsection(&mut out, "New Features", &analysis.new_features);
    push_subsection(&mut out, "Bug Fixes", &analysis.bug_fixes);
    out
}

fn push_bullets(out: &mut String, heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    out.push_str(&format!("## {}\n\n", heading));
    for item in items {
        out.push_str(&format!("- {}\n", item));
    }
    out.push('\n');
}

fn push_subsection(out: &mut String, heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    out.push_str(&format!("### {}\n\n", heading));
    for item in items {
        out.push_str(&format!("- {}\n", item));
    }
    out.push('\n');
}

fn code_items(items: &[String]) -> Vec<String> {
    items.iter().map(|s| format!("`{}`", s.replace('`', "'"))).collect()
}

/// Fence `content` with enough backticks that it cannot close the fence early.
fn fenced(content: &str) -> String {
    let longest_run = content
        .split(|c| c != '`')
        .map(str::len)
        .max()
        .unwrap_or(0);
    let fence = "`".repeat(longest_run.max(2) + 1);
    format!("{fence}\n{content}\n{fence}\n\n")
}

/// Drop a leading `# Title` line; the renderer adds its own.
fn strip_title(document: &str) -> &str {
    let trimmed = document.trim_start();
    if trimmed.starts_with("# ") {
        trimmed.split_once('\n').map(|(_, rest)| rest).unwrap_or("")
    } else {
        trimmed
    }
}

fn plain_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(plain_value)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

/// Escape characters MDX would read as JSX or expressions.
fn mdx_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '{' => out.push_str("\\{"),
            '}' => out.push_str("\\}"),
            '<' => out.push_str("&lt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Collapse line breaks so the text stays inside one blockquote line.
fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// HTML comments may not contain `--`.
fn comment_safe(text: &str) -> String {
    text.replace("--", "- -")
}
