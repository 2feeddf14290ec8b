//! The change model extracted from a unified diff.

use std::fmt;

use serde::Serialize;

use crate::config::IgnoreMatcher;

/// Kind of change applied to a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
    Renamed,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Added => "added",
            ChangeKind::Modified => "modified",
            ChangeKind::Deleted => "deleted",
            ChangeKind::Renamed => "renamed",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One hunk of a file's diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineEdit {
    pub old_start: u32,
    pub old_lines: u32,
    pub new_start: u32,
    pub new_lines: u32,
    /// Number of `-` lines in the hunk.
    pub removed: u32,
    /// Number of `+` lines in the hunk.
    pub added: u32,
    /// Added lines with the `+` marker stripped.
    pub added_text: Vec<String>,
    /// Removed lines with the `-` marker stripped.
    pub removed_text: Vec<String>,
    /// Function context git prints after the closing `@@`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
}

impl LineEdit {
    /// Re-serialize the hunk header.
    ///
    /// Follows git's convention of omitting a count of 1, so the output parses
    /// back to the same start/count fields.
    pub fn header(&self) -> String {
        let mut header = format!(
            "@@ -{} +{} @@",
            range_spec(self.old_start, self.old_lines),
            range_spec(self.new_start, self.new_lines)
        );
        if let Some(section) = &self.section {
            header.push(' ');
            header.push_str(section);
        }
        header
    }

    /// Inclusive range of new-file lines touched by this hunk, if any.
    ///
    /// The end saturates at `u32::MAX` for headers whose start and count overflow.
    pub fn new_range(&self) -> Option<(u32, u32)> {
        (self.new_lines > 0).then(|| {
            let end = self.new_start.saturating_add(self.new_lines - 1);
            (self.new_start, end)
        })
    }
}

fn range_spec(start: u32, lines: u32) -> String {
    if lines == 1 {
        start.to_string()
    } else {
        format!("{start},{lines}")
    }
}

/// One file touched by a diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileChange {
    /// New path, or the removed path for deletions.
    pub path: String,
    pub kind: ChangeKind,
    /// Previous path, present only for renames.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_path: Option<String>,
    pub edits: Vec<LineEdit>,
    /// Line-level content is undefined for binary files, so `edits` is empty.
    pub binary: bool,
}

impl FileChange {
    pub fn lines_added(&self) -> u32 {
        self.edits.iter().map(|e| e.added).sum()
    }

    pub fn lines_removed(&self) -> u32 {
        self.edits.iter().map(|e| e.removed).sum()
    }

    /// File name without directories.
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// Ordered file changes from one diff, in emission order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ChangeSet {
    files: Vec<FileChange>,
}

impl ChangeSet {
    pub fn new(files: Vec<FileChange>) -> Self {
        Self { files }
    }

    pub fn files(&self) -> &[FileChange] {
        &self.files
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FileChange> {
        self.files.iter()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn lines_added(&self) -> u32 {
        self.files.iter().map(FileChange::lines_added).sum()
    }

    pub fn lines_removed(&self) -> u32 {
        self.files.iter().map(FileChange::lines_removed).sum()
    }

    /// Count files per kind, in the order each kind first appears.
    pub fn count_by_kind(&self) -> Vec<(ChangeKind, usize)> {
        let mut counts: Vec<(ChangeKind, usize)> = Vec::new();
        for file in &self.files {
            match counts.iter_mut().find(|(kind, _)| *kind == file.kind) {
                Some((_, count)) => *count += 1,
                None => counts.push((file.kind, 1)),
            }
        }
        counts
    }

    /// Drop files whose path (or old path, for renames) matches an ignore pattern.
    pub fn without_ignored(self, ignore: &IgnoreMatcher) -> Self {
        let files = self
            .files
            .into_iter()
            .filter(|f| {
                !ignore.is_ignored(&f.path)
                    && !f.old_path.as_deref().is_some_and(|p| ignore.is_ignored(p))
            })
            .collect();
        Self { files }
    }
}

impl<'a> IntoIterator for &'a ChangeSet {
    type Item = &'a FileChange;
    type IntoIter = std::slice::Iter<'a, FileChange>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.iter()
    }
}
