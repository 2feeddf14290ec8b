//! Integration tests for unified diff parsing against fixture diffs.

mod common;

use common::{diff_fixture, read_fixture};
use doctr::diff::{ChangeKind, ChangeSet, parse_unified_diff};
use doctr::error::DiffError;

fn parse_fixture(name: &str) -> ChangeSet {
    parse_unified_diff(&read_fixture(diff_fixture(name)))
        .unwrap_or_else(|e| panic!("Failed to parse {}: {}", name, e))
}

#[test]
fn test_added_file() {
    let set = parse_fixture("add_foo.diff");

    assert_eq!(set.len(), 1);
    let file = &set.files()[0];
    assert_eq!(file.path, "foo.py");
    assert_eq!(file.kind, ChangeKind::Added);
    assert_eq!(file.old_path, None);
    assert_eq!(file.edits.len(), 1);

    let edit = &file.edits[0];
    assert_eq!((edit.new_start, edit.new_lines), (1, 3));
    assert_eq!(edit.added, 3);
    assert_eq!(edit.removed, 0);
    assert_eq!(edit.added_text, vec!["def foo():", "    return 1", ""]);
}

#[test]
fn test_deleted_file() {
    let set = parse_fixture("delete_bar.diff");

    let file = &set.files()[0];
    assert_eq!(file.path, "bar.py");
    assert_eq!(file.kind, ChangeKind::Deleted);
    assert_eq!(file.lines_removed(), 2);
    assert_eq!(file.lines_added(), 0);
}

#[test]
fn test_pure_rename_has_no_edits() {
    let set = parse_fixture("rename_only.diff");

    let file = &set.files()[0];
    assert_eq!(file.kind, ChangeKind::Renamed);
    assert_eq!(file.path, "src/new_name.rs");
    assert_eq!(file.old_path.as_deref(), Some("src/old_name.rs"));
    assert!(file.edits.is_empty());
}

#[test]
fn test_mixed_diff() {
    let set = parse_fixture("mixed.diff");

    let paths: Vec<&str> = set.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, vec!["src/config.rs", "README.md", "assets/logo.png"]);

    let config = &set.files()[0];
    assert_eq!(config.kind, ChangeKind::Modified);
    assert_eq!(config.edits.len(), 2);
    assert_eq!(config.edits[0].section.as_deref(), Some("pub struct Config {"));
    assert_eq!(config.edits[1].section.as_deref(), Some("impl Config {"));
    assert_eq!(config.edits[0].removed_text, vec!["    pub debug: bool,"]);

    let logo = &set.files()[2];
    assert!(logo.binary);
    assert_eq!(logo.kind, ChangeKind::Modified);
    assert!(logo.edits.is_empty());

    assert_eq!(set.lines_added(), 5);
    assert_eq!(set.lines_removed(), 2);
    assert_eq!(
        set.count_by_kind(),
        vec![(ChangeKind::Modified, 2), (ChangeKind::Added, 1)]
    );
}

#[test]
fn test_hunk_headers_serialize_back() {
    let set = parse_fixture("mixed.diff");
    let headers: Vec<String> = set
        .iter()
        .flat_map(|f| f.edits.iter().map(|e| e.header()))
        .collect();

    assert_eq!(
        headers,
        vec![
            "@@ -10,6 +10,7 @@ pub struct Config {",
            "@@ -40,3 +41,3 @@ impl Config {",
            "@@ -0,0 +1,2 @@",
        ]
    );

    let single = parse_fixture("no_newline.diff");
    assert_eq!(single.files()[0].edits[0].header(), "@@ -1 +1 @@");
}

#[test]
fn test_parsing_is_deterministic() {
    let text = read_fixture(diff_fixture("mixed.diff"));
    let first = parse_unified_diff(&text).unwrap();
    let second = parse_unified_diff(&text).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_concatenated_diffs_keep_order() {
    let text = format!(
        "{}{}",
        read_fixture(diff_fixture("add_foo.diff")),
        read_fixture(diff_fixture("delete_bar.diff"))
    );
    let set = parse_unified_diff(&text).unwrap();

    let kinds: Vec<(&str, ChangeKind)> = set.iter().map(|f| (f.path.as_str(), f.kind)).collect();
    assert_eq!(
        kinds,
        vec![("foo.py", ChangeKind::Added), ("bar.py", ChangeKind::Deleted)]
    );
}

#[test]
fn test_quoted_non_ascii_path() {
    let set = parse_fixture("quoted_path.diff");
    assert_eq!(set.files()[0].path, "docs/café notes.md");
    assert_eq!(set.files()[0].kind, ChangeKind::Modified);
}

#[test]
fn test_no_newline_marker_is_not_content() {
    let set = parse_fixture("no_newline.diff");
    let edit = &set.files()[0].edits[0];
    assert_eq!(edit.removed_text, vec!["0.1.0"]);
    assert_eq!(edit.added_text, vec!["0.2.0"]);
}

#[test]
fn test_empty_input_is_empty_change_set() {
    assert!(parse_unified_diff("").unwrap().is_empty());
    assert!(parse_unified_diff("\n\n").unwrap().is_empty());
}

#[test]
fn test_truncated_hunk_is_malformed() {
    let err = parse_unified_diff(&read_fixture(diff_fixture("truncated_hunk.diff"))).unwrap_err();
    assert!(
        matches!(err, DiffError::Malformed { line: 8, .. }),
        "unexpected error: {err}"
    );
}

#[test]
fn test_invalid_hunk_header_is_malformed() {
    let err = parse_unified_diff(&read_fixture(diff_fixture("bad_header.diff"))).unwrap_err();
    assert!(
        matches!(err, DiffError::Malformed { line: 5, .. }),
        "unexpected error: {err}"
    );
}

#[test]
fn test_garbage_input_is_malformed() {
    let err = parse_unified_diff("this is not a diff\n").unwrap_err();
    assert!(matches!(err, DiffError::Malformed { line: 1, .. }));
}

#[test]
fn test_binary_sides_follow_dev_null() {
    let set = parse_fixture("binary_sides.diff");

    let kinds: Vec<(&str, ChangeKind, bool)> = set
        .iter()
        .map(|f| (f.path.as_str(), f.kind, f.binary))
        .collect();
    assert_eq!(
        kinds,
        vec![
            ("assets/icon.png", ChangeKind::Added, true),
            ("assets/old.png", ChangeKind::Deleted, true),
        ]
    );
    assert!(set.iter().all(|f| f.edits.is_empty()));
}

#[test]
fn test_git_binary_patch_payload_is_skipped() {
    let set = parse_fixture("binary_patch.diff");

    assert_eq!(set.len(), 2);
    let font = &set.files()[0];
    assert_eq!(font.path, "fonts/mono.woff");
    assert_eq!(font.kind, ChangeKind::Added);
    assert!(font.binary);
    assert!(font.edits.is_empty());

    let notes = &set.files()[1];
    assert_eq!(notes.path, "notes.txt");
    assert_eq!(notes.kind, ChangeKind::Modified);
    assert_eq!(notes.edits[0].added_text, vec!["second"]);
}

#[test]
fn test_copy_is_an_added_file() {
    let set = parse_fixture("copy.diff");

    let file = &set.files()[0];
    assert_eq!(file.path, "src/base_copy.rs");
    assert_eq!(file.kind, ChangeKind::Added);
    assert_eq!(file.old_path, None);
    assert!(file.edits.is_empty());
}

#[test]
fn test_mode_only_change_is_modified_without_edits() {
    let set = parse_fixture("mode_change.diff");

    assert_eq!(set.len(), 1);
    let file = &set.files()[0];
    assert_eq!(file.path, "scripts/run.sh");
    assert_eq!(file.kind, ChangeKind::Modified);
    assert!(!file.binary);
    assert!(file.edits.is_empty());
}

#[test]
fn test_created_and_deleted_is_malformed() {
    let err = parse_unified_diff(&read_fixture(diff_fixture("created_and_deleted.diff"))).unwrap_err();
    assert!(
        matches!(err, DiffError::Malformed { line: 1, .. }),
        "unexpected error: {err}"
    );
}

#[test]
fn test_crlf_payload_is_kept_verbatim() {
    let text = "--- a/win.txt\r\n+++ b/win.txt\r\n@@ -1 +1,2 @@\r\n-old\r\n+new\r\n+last";
    let set = parse_unified_diff(text).unwrap();

    let file = &set.files()[0];
    assert_eq!(file.path, "win.txt");
    assert_eq!(file.edits[0].removed_text, vec!["old\r"]);
    assert_eq!(file.edits[0].added_text, vec!["new\r", "last"]);
}
