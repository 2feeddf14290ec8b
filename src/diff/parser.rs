//! Unified diff parsing into a [`ChangeSet`].
//!
//! Accepts both git-style output (`diff --git` headers followed by extended
//! header lines) and plain unified diffs made of `---`/`+++` pairs. Parsing is a
//! single pass over the input; any line that does not fit the grammar aborts
//! with [`DiffError::Malformed`] rather than producing a partial result.

use std::sync::LazyLock;

use regex_lite::Regex;
use tracing::debug;

use crate::error::DiffError;

use super::model::{ChangeKind, ChangeSet, FileChange, LineEdit};

static HUNK_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@(?: (.*))?$")
        .expect("Invalid hunk header regex")
});

const DEV_NULL: &str = "/dev/null";

/// One side of a `---`/`+++` header.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Side {
    DevNull,
    Path(String),
}

/// Accumulates header lines and hunks for the file currently being parsed.
#[derive(Debug, Default)]
struct FileBuilder {
    header_line: usize,
    git_old: Option<String>,
    git_new: Option<String>,
    minus: Option<Side>,
    plus: Option<Side>,
    rename_from: Option<String>,
    rename_to: Option<String>,
    copy_to: Option<String>,
    new_file: bool,
    deleted_file: bool,
    binary: bool,
    edits: Vec<LineEdit>,
}

impl FileBuilder {
    fn starts_at(line: usize) -> Self {
        Self {
            header_line: line,
            ..Default::default()
        }
    }

    fn is_git(&self) -> bool {
        self.git_old.is_some() || self.git_new.is_some()
    }

    fn finish(self) -> Result<FileChange, DiffError> {
        let added = self.new_file || self.copy_to.is_some() || self.minus == Some(Side::DevNull);
        let deleted = self.deleted_file || self.plus == Some(Side::DevNull);

        if added && deleted {
            return Err(DiffError::malformed(
                self.header_line,
                "file is both created and deleted",
            ));
        }

        let old_side = side_path(&self.minus)
            .or(self.rename_from.clone())
            .or(self.git_old.clone());
        let new_side = self
            .rename_to
            .clone()
            .or(self.copy_to.clone())
            .or(side_path(&self.plus))
            .or(self.git_new.clone());

        let renamed = matches!(
            (&self.rename_from, &self.rename_to),
            (Some(from), Some(to)) if !from.is_empty() && !to.is_empty() && from != to
        );

        let (kind, path, old_path) = if deleted {
            (ChangeKind::Deleted, old_side.or(new_side), None)
        } else if added {
            (ChangeKind::Added, new_side.or(old_side), None)
        } else if renamed {
            (ChangeKind::Renamed, self.rename_to.clone(), self.rename_from.clone())
        } else {
            (ChangeKind::Modified, new_side.or(old_side), None)
        };

        let path = path
            .filter(|p| !p.is_empty())
            .ok_or_else(|| DiffError::malformed(self.header_line, "could not determine file path"))?;

        Ok(FileChange {
            path,
            kind,
            old_path,
            edits: self.edits,
            binary: self.binary,
        })
    }
}

fn side_path(side: &Option<Side>) -> Option<String> {
    match side {
        Some(Side::Path(p)) => Some(p.clone()),
        _ => None,
    }
}

/// A hunk whose body is still being consumed.
#[derive(Debug)]
struct OpenHunk {
    header_line: usize,
    old_remaining: u32,
    new_remaining: u32,
    edit: LineEdit,
}

impl OpenHunk {
    fn is_complete(&self) -> bool {
        self.old_remaining == 0 && self.new_remaining == 0
    }
}

#[derive(Debug)]
enum State {
    Headers,
    Hunk(OpenHunk),
    BinaryPayload,
}

/// Parse unified diff text into a [`ChangeSet`].
///
/// Empty or whitespace-only input yields an empty change set.
pub fn parse_unified_diff(text: &str) -> Result<ChangeSet, DiffError> {
    let mut files = Vec::new();
    let mut current: Option<FileBuilder> = None;
    let mut state = State::Headers;
    let mut pending_plus: Option<usize> = None;

    // Split on '\n' only: hunk payloads keep a trailing '\r' verbatim.
    let body = text.strip_suffix('\n').unwrap_or(text);
    for (idx, raw) in body.split('\n').enumerate() {
        let line_no = idx + 1;

        match &mut state {
            State::Hunk(hunk) => {
                consume_hunk_line(hunk, raw, line_no)?;
                if hunk.is_complete() {
                    if let State::Hunk(hunk) = std::mem::replace(&mut state, State::Headers) {
                        push_edit(&mut current, hunk.edit);
                    }
                }
                continue;
            }
            State::BinaryPayload => {
                if !raw.starts_with("diff --git ") {
                    continue;
                }
                state = State::Headers;
            }
            State::Headers => {}
        }

        let line = raw.strip_suffix('\r').unwrap_or(raw);

        if let Some(started) = pending_plus.take() {
            let Some(rest) = line.strip_prefix("+++ ") else {
                return Err(DiffError::malformed(
                    line_no,
                    format!("expected '+++' header after '---' on line {started}"),
                ));
            };
            if let Some(file) = current.as_mut() {
                file.plus = Some(parse_side(rest, "b/"));
            }
            continue;
        }

        if let Some(rest) = line.strip_prefix("diff --git ") {
            finish_file(&mut current, &mut files)?;
            let (old, new) = parse_git_header_paths(rest)
                .ok_or_else(|| DiffError::malformed(line_no, "unreadable 'diff --git' header"))?;
            let mut file = FileBuilder::starts_at(line_no);
            file.git_old = Some(old);
            file.git_new = Some(new);
            current = Some(file);
        } else if line.starts_with("diff ") {
            // `diff -ruN a b` style command lines precede a plain ---/+++ pair.
            finish_file(&mut current, &mut files)?;
            current = Some(FileBuilder::starts_at(line_no));
        } else if let Some(rest) = line.strip_prefix("--- ") {
            let needs_new_file = match &current {
                Some(file) => file.minus.is_some() || !file.edits.is_empty(),
                None => true,
            };
            if needs_new_file {
                finish_file(&mut current, &mut files)?;
                current = Some(FileBuilder::starts_at(line_no));
            }
            if let Some(file) = current.as_mut() {
                file.minus = Some(parse_side(rest, "a/"));
            }
            pending_plus = Some(line_no);
        } else if line.starts_with("+++ ") {
            return Err(DiffError::malformed(
                line_no,
                "'+++' header without a preceding '---' header",
            ));
        } else if line.starts_with("@@") {
            let Some(file) = current.as_mut() else {
                return Err(DiffError::malformed(
                    line_no,
                    "hunk header outside of a file section",
                ));
            };
            if !file.is_git() && file.minus.is_none() {
                return Err(DiffError::malformed(
                    line_no,
                    "hunk header before the file's '---'/'+++' headers",
                ));
            }
            let hunk = parse_hunk_header(line, line_no)?;
            if hunk.is_complete() {
                file.edits.push(hunk.edit);
            } else {
                state = State::Hunk(hunk);
            }
        } else if line.trim().is_empty() || line.starts_with('\\') {
            // Blank separators and a trailing "\ No newline at end of file".
            continue;
        } else if let Some(file) = current.as_mut() {
            apply_extended_header(file, line, line_no, &mut state)?;
        } else {
            return Err(DiffError::malformed(
                line_no,
                format!("expected a diff header, found '{}'", preview(line)),
            ));
        }
    }

    if let Some(started) = pending_plus {
        return Err(DiffError::malformed(
            started,
            "'---' header is not followed by a '+++' header",
        ));
    }
    if let State::Hunk(hunk) = state {
        return Err(DiffError::malformed(
            hunk.header_line,
            format!(
                "hunk ends early: {} old and {} new line(s) missing",
                hunk.old_remaining, hunk.new_remaining
            ),
        ));
    }
    finish_file(&mut current, &mut files)?;

    debug!("Parsed diff into {} file change(s)", files.len());
    Ok(ChangeSet::new(files))
}

fn finish_file(
    current: &mut Option<FileBuilder>,
    files: &mut Vec<FileChange>,
) -> Result<(), DiffError> {
    if let Some(file) = current.take() {
        files.push(file.finish()?);
    }
    Ok(())
}

fn push_edit(current: &mut Option<FileBuilder>, edit: LineEdit) {
    if let Some(file) = current.as_mut() {
        file.edits.push(edit);
    }
}

/// Handle git's extended header lines (`new file mode`, `rename from`, ...).
fn apply_extended_header(
    file: &mut FileBuilder,
    line: &str,
    line_no: usize,
    state: &mut State,
) -> Result<(), DiffError> {
    if line.starts_with("new file mode ") {
        file.new_file = true;
    } else if line.starts_with("deleted file mode ") {
        file.deleted_file = true;
    } else if let Some(rest) = line.strip_prefix("rename from ") {
        file.rename_from = Some(unquote(rest));
    } else if let Some(rest) = line.strip_prefix("rename to ") {
        file.rename_to = Some(unquote(rest));
    } else if line.starts_with("copy from ") {
        // The source of a copy is untouched; only the destination matters.
    } else if let Some(rest) = line.strip_prefix("copy to ") {
        file.copy_to = Some(unquote(rest));
    } else if let Some(rest) = line.strip_prefix("Binary files ") {
        file.binary = true;
        apply_binary_sides(file, rest.strip_suffix(" differ").unwrap_or(rest));
    } else if line == "GIT binary patch" {
        file.binary = true;
        *state = State::BinaryPayload;
    } else if line.starts_with("index ")
        || line.starts_with("old mode ")
        || line.starts_with("new mode ")
        || line.starts_with("similarity index ")
        || line.starts_with("dissimilarity index ")
    {
        // Carries no information for the change model.
    } else {
        return Err(DiffError::malformed(
            line_no,
            format!("unexpected line in file header: '{}'", preview(line)),
        ));
    }
    Ok(())
}

/// Record `/dev/null` sides from a `Binary files X and Y differ` line.
fn apply_binary_sides(file: &mut FileBuilder, sides: &str) {
    if sides.starts_with("/dev/null and ") {
        file.minus.get_or_insert(Side::DevNull);
    }
    if sides.ends_with(" and /dev/null") {
        file.plus.get_or_insert(Side::DevNull);
    }
    if !file.is_git() && file.minus.is_none() && file.plus.is_none() {
        if let Some((old, new)) = sides.split_once(" and ") {
            file.minus = Some(parse_side(old, "a/"));
            file.plus = Some(parse_side(new, "b/"));
        }
    }
}

fn consume_hunk_line(hunk: &mut OpenHunk, line: &str, line_no: usize) -> Result<(), DiffError> {
    let (marker, content) = match line.chars().next() {
        // Some tools strip the single space of an empty context line.
        None => (' ', ""),
        Some('\r') if line.len() == 1 => (' ', ""),
        Some(c) => (c, &line[c.len_utf8()..]),
    };

    match marker {
        ' ' => {
            if hunk.old_remaining == 0 || hunk.new_remaining == 0 {
                return Err(overflow(line_no, hunk));
            }
            hunk.old_remaining -= 1;
            hunk.new_remaining -= 1;
        }
        '+' => {
            if hunk.new_remaining == 0 {
                return Err(overflow(line_no, hunk));
            }
            hunk.new_remaining -= 1;
            hunk.edit.added += 1;
            hunk.edit.added_text.push(content.to_string());
        }
        '-' => {
            if hunk.old_remaining == 0 {
                return Err(overflow(line_no, hunk));
            }
            hunk.old_remaining -= 1;
            hunk.edit.removed += 1;
            hunk.edit.removed_text.push(content.to_string());
        }
        // "\ No newline at end of file"
        '\\' => {}
        _ => {
            return Err(DiffError::malformed(
                line_no,
                format!("invalid line inside hunk: '{}'", preview(line)),
            ));
        }
    }
    Ok(())
}

fn overflow(line_no: usize, hunk: &OpenHunk) -> DiffError {
    DiffError::malformed(
        line_no,
        format!(
            "hunk starting on line {} has more lines than its header declares",
            hunk.header_line
        ),
    )
}

fn parse_hunk_header(line: &str, line_no: usize) -> Result<OpenHunk, DiffError> {
    let caps = HUNK_HEADER
        .captures(line)
        .ok_or_else(|| DiffError::malformed(line_no, format!("invalid hunk header '{}'", preview(line))))?;

    let number = |idx: usize, default: u32| -> Result<u32, DiffError> {
        match caps.get(idx) {
            Some(m) => m
                .as_str()
                .parse()
                .map_err(|_| DiffError::malformed(line_no, "hunk header number out of range")),
            None => Ok(default),
        }
    };

    let old_start = number(1, 0)?;
    let old_lines = number(2, 1)?;
    let new_start = number(3, 0)?;
    let new_lines = number(4, 1)?;
    let section = caps
        .get(5)
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    Ok(OpenHunk {
        header_line: line_no,
        old_remaining: old_lines,
        new_remaining: new_lines,
        edit: LineEdit {
            old_start,
            old_lines,
            new_start,
            new_lines,
            removed: 0,
            added: 0,
            added_text: Vec::new(),
            removed_text: Vec::new(),
            section,
        },
    })
}

/// Parse the value of a `---`/`+++` header.
fn parse_side(raw: &str, prefix: &str) -> Side {
    // Plain diffs append a tab-separated timestamp.
    let value = raw.split('\t').next().unwrap_or(raw).trim_end();
    if value == DEV_NULL {
        return Side::DevNull;
    }
    let path = unquote(value);
    Side::Path(strip_prefix(&path, prefix))
}

fn strip_prefix(path: &str, prefix: &str) -> String {
    path.strip_prefix(prefix).unwrap_or(path).to_string()
}

/// Split the `a/<old> b/<new>` part of a `diff --git` line.
fn parse_git_header_paths(rest: &str) -> Option<(String, String)> {
    let (old, new) = if rest.starts_with('"') {
        let (old, remainder) = take_quoted(rest)?;
        let remainder = remainder.trim_start();
        let new = if remainder.starts_with('"') {
            take_quoted(remainder)?.0
        } else {
            remainder.to_string()
        };
        (old, new)
    } else if let Some(idx) = rest.find(" \"") {
        let new = take_quoted(&rest[idx + 1..])?.0;
        (rest[..idx].to_string(), new)
    } else {
        split_unquoted_paths(rest)?
    };

    Some((strip_prefix(&old, "a/"), strip_prefix(&new, "b/")))
}

/// Split two unquoted paths, preferring the split where both sides name the
/// same file (paths may themselves contain spaces).
fn split_unquoted_paths(rest: &str) -> Option<(String, String)> {
    let candidates: Vec<usize> = rest.match_indices(" b/").map(|(i, _)| i).collect();

    for &idx in &candidates {
        let (old, new) = (&rest[..idx], &rest[idx + 1..]);
        if old.strip_prefix("a/") == new.strip_prefix("b/") {
            return Some((old.to_string(), new.to_string()));
        }
    }
    if let Some(&idx) = candidates.first() {
        return Some((rest[..idx].to_string(), rest[idx + 1..].to_string()));
    }

    // --no-prefix output: both halves are identical for non-renames.
    let mid = rest.len() / 2;
    if rest.len() % 2 == 1 && rest.is_char_boundary(mid) && rest.as_bytes()[mid] == b' ' {
        let (old, new) = (&rest[..mid], &rest[mid + 1..]);
        if old == new {
            return Some((old.to_string(), new.to_string()));
        }
    }
    rest.split_once(' ')
        .map(|(old, new)| (old.to_string(), new.to_string()))
}

/// Unquote a path if git wrapped it in C-style quotes.
fn unquote(value: &str) -> String {
    if value.starts_with('"') {
        if let Some((path, _)) = take_quoted(value) {
            return path;
        }
    }
    value.to_string()
}

/// Read one C-style quoted string, returning it and the text after the closing quote.
fn take_quoted(input: &str) -> Option<(String, &str)> {
    let body = input.strip_prefix('"')?;
    let bytes = body.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'"' => {
                let decoded = String::from_utf8_lossy(&out).into_owned();
                return Some((decoded, &body[i + 1..]));
            }
            b'\\' => {
                let escaped = *bytes.get(i + 1)?;
                match escaped {
                    b'0'..=b'7' => {
                        let digits = &bytes[i + 1..(i + 4).min(bytes.len())];
                        let octal = std::str::from_utf8(digits).ok()?;
                        out.push(u8::from_str_radix(octal, 8).ok()?);
                        i += 1 + digits.len();
                        continue;
                    }
                    b'n' => out.push(b'\n'),
                    b't' => out.push(b'\t'),
                    b'r' => out.push(b'\r'),
                    b'a' => out.push(0x07),
                    b'b' => out.push(0x08),
                    b'f' => out.push(0x0c),
                    b'v' => out.push(0x0b),
                    other => out.push(other),
                }
                i += 2;
            }
            other => {
                out.push(other);
                i += 1;
            }
        }
    }

    None
}

fn preview(line: &str) -> String {
    line.chars().take(60).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hunk_header_with_counts() {
        let hunk = parse_hunk_header("@@ -10,7 +10,8 @@ fn main() {", 1).unwrap();
        assert_eq!(hunk.edit.old_start, 10);
        assert_eq!(hunk.edit.old_lines, 7);
        assert_eq!(hunk.edit.new_start, 10);
        assert_eq!(hunk.edit.new_lines, 8);
        assert_eq!(hunk.edit.section.as_deref(), Some("fn main() {"));
    }

    #[test]
    fn test_hunk_header_omitted_counts_default_to_one() {
        let hunk = parse_hunk_header("@@ -3 +3 @@", 1).unwrap();
        assert_eq!(hunk.edit.old_lines, 1);
        assert_eq!(hunk.edit.new_lines, 1);
        assert_eq!(hunk.edit.section, None);
    }

    #[test]
    fn test_hunk_header_rejects_garbage() {
        let err = parse_hunk_header("@@ nonsense @@", 7).unwrap_err();
        assert!(matches!(err, DiffError::Malformed { line: 7, .. }));
    }

    #[test]
    fn test_git_header_paths_simple() {
        assert_eq!(
            parse_git_header_paths("a/src/lib.rs b/src/lib.rs"),
            Some(("src/lib.rs".to_string(), "src/lib.rs".to_string()))
        );
    }

    #[test]
    fn test_git_header_paths_with_spaces() {
        assert_eq!(
            parse_git_header_paths("a/my b/file.txt b/my b/file.txt"),
            Some(("my b/file.txt".to_string(), "my b/file.txt".to_string()))
        );
    }

    #[test]
    fn test_git_header_paths_rename() {
        assert_eq!(
            parse_git_header_paths("a/old.rs b/new.rs"),
            Some(("old.rs".to_string(), "new.rs".to_string()))
        );
    }

    #[test]
    fn test_git_header_paths_quoted() {
        assert_eq!(
            parse_git_header_paths(r#""a/caf\303\251.txt" "b/caf\303\251.txt""#),
            Some(("café.txt".to_string(), "café.txt".to_string()))
        );
    }

    #[test]
    fn test_parse_side_strips_timestamp_and_prefix() {
        assert_eq!(
            parse_side("a/foo.py\t2024-01-01 10:00:00", "a/"),
            Side::Path("foo.py".to_string())
        );
        assert_eq!(parse_side("/dev/null", "a/"), Side::DevNull);
    }

    #[test]
    fn test_unquote_escapes() {
        assert_eq!(unquote(r#""tab\there""#), "tab\there");
        assert_eq!(unquote(r#""quote\"d""#), "quote\"d");
        assert_eq!(unquote("plain"), "plain");
    }

    #[test]
    fn test_empty_context_line_counts_as_context() {
        let diff = "--- a/x.txt\n+++ b/x.txt\n@@ -1,3 +1,3 @@\n one\n\n-three\n+THREE\n";
        let set = parse_unified_diff(diff).unwrap();
        let edit = &set.files()[0].edits[0];
        assert_eq!(edit.removed, 1);
        assert_eq!(edit.added, 1);
    }

    #[test]
    fn test_hunk_overflow_is_malformed() {
        let diff = "--- a/x.txt\n+++ b/x.txt\n@@ -1 +1 @@\n-a\n+b\n+c\n";
        // The third body line starts a new header context and is not a valid header.
        let err = parse_unified_diff(diff).unwrap_err();
        assert!(matches!(err, DiffError::Malformed { line: 6, .. }));
    }
}
