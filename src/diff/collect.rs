//! Diff collection from a git repository using git2.

use std::io::Read;
use std::path::Path;

use git2::{Diff, DiffFindOptions, DiffFormat, DiffOptions, Object, Repository, RevparseMode, Tree};
use tracing::debug;

use crate::error::DiffError;

/// Open the repository containing `path`, searching parent directories.
pub fn open_repository(path: &Path) -> Result<Repository, DiffError> {
    Repository::discover(path).map_err(DiffError::OpenRepository)
}

/// Produce unified diff text for a free-form revision expression.
///
/// A single revision (`HEAD~1`, a tag, a hash) is compared against the working
/// tree including staged changes, matching `git diff <rev>`. Ranges `A..B` and
/// `A...B` compare two trees, the latter from the merge base.
pub fn collect_diff_text(repo: &Repository, target: &str) -> Result<String, DiffError> {
    let spec = repo
        .revparse(target)
        .map_err(|e| DiffError::TargetNotFound(target.to_string(), e))?;

    let mut opts = DiffOptions::new();
    let mut diff = if spec.mode().contains(RevparseMode::RANGE) {
        let from = spec.from().ok_or_else(|| missing_side(target))?;
        let to = match spec.to() {
            Some(to) => to.clone(),
            None => repo
                .revparse_single("HEAD")
                .map_err(|e| DiffError::TargetNotFound(target.to_string(), e))?,
        };

        let from_tree = if spec.mode().contains(RevparseMode::MERGE_BASE) {
            let base = repo
                .merge_base(peel_commit_id(from, target)?, peel_commit_id(&to, target)?)
                .map_err(|e| DiffError::TargetNotFound(target.to_string(), e))?;
            repo.find_commit(base)
                .and_then(|c| c.tree())
                .map_err(DiffError::DiffFailed)?
        } else {
            peel_tree(from, target)?
        };
        let to_tree = peel_tree(&to, target)?;

        debug!("Diffing tree range {}", target);
        repo.diff_tree_to_tree(Some(&from_tree), Some(&to_tree), Some(&mut opts))
    } else {
        let from = spec.from().ok_or_else(|| missing_side(target))?;
        let tree = peel_tree(from, target)?;

        debug!("Diffing {} against the working tree", target);
        repo.diff_tree_to_workdir_with_index(Some(&tree), Some(&mut opts))
    }
    .map_err(DiffError::DiffFailed)?;

    let mut find = DiffFindOptions::new();
    find.renames(true);
    diff.find_similar(Some(&mut find))
        .map_err(DiffError::DiffFailed)?;

    diff_to_text(&diff)
}

/// Render a git2 diff in unified patch format.
pub fn diff_to_text(diff: &Diff<'_>) -> Result<String, DiffError> {
    let mut text = String::new();

    diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
        // Header and hunk lines carry their own text; body lines need the origin marker.
        let origin = line.origin();
        if origin == '+' || origin == '-' || origin == ' ' {
            text.push(origin);
        }
        text.push_str(&String::from_utf8_lossy(line.content()));
        true
    })
    .map_err(DiffError::DiffFailed)?;

    Ok(text)
}

/// Read diff text from a file, or from stdin when `path` is `-`.
pub fn read_diff_input(path: &Path) -> Result<String, DiffError> {
    let mut bytes = Vec::new();
    if path.as_os_str() == "-" {
        std::io::stdin()
            .read_to_end(&mut bytes)
            .map_err(DiffError::ReadFailed)?;
    } else {
        bytes = std::fs::read(path).map_err(DiffError::ReadFailed)?;
    }
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn peel_tree<'r>(object: &Object<'r>, target: &str) -> Result<Tree<'r>, DiffError> {
    object
        .peel_to_tree()
        .map_err(|e| DiffError::TargetNotFound(target.to_string(), e))
}

fn peel_commit_id(object: &Object<'_>, target: &str) -> Result<git2::Oid, DiffError> {
    object
        .peel_to_commit()
        .map(|c| c.id())
        .map_err(|e| DiffError::TargetNotFound(target.to_string(), e))
}

fn missing_side(target: &str) -> DiffError {
    DiffError::TargetNotFound(
        target.to_string(),
        git2::Error::from_str("revision expression resolved to nothing"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn commit_file(repo: &Repository, name: &str, content: &str, message: &str) {
        let root = repo.workdir().unwrap();
        std::fs::write(root.join(name), content).unwrap();

        let mut index = repo.index().unwrap();
        index.add_path(Path::new(name)).unwrap();
        index.write().unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        let sig = git2::Signature::now("Test", "test@example.com").unwrap();
        let parents: Vec<git2::Commit> = repo
            .head()
            .ok()
            .and_then(|h| h.peel_to_commit().ok())
            .into_iter()
            .collect();
        let parent_refs: Vec<&git2::Commit> = parents.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parent_refs)
            .unwrap();
    }

    #[test]
    fn test_unknown_target_is_reported() {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        commit_file(&repo, "a.txt", "one\n", "init");

        let err = collect_diff_text(&repo, "no-such-branch").unwrap_err();
        assert!(matches!(err, DiffError::TargetNotFound(ref t, _) if t == "no-such-branch"));
    }

    #[test]
    fn test_head_against_clean_tree_is_empty() {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        commit_file(&repo, "a.txt", "one\n", "init");

        assert_eq!(collect_diff_text(&repo, "HEAD").unwrap(), "");
    }

    #[test]
    fn test_previous_commit_includes_body_markers() {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        commit_file(&repo, "a.txt", "one\n", "init");
        commit_file(&repo, "a.txt", "one\ntwo\n", "second");

        let text = collect_diff_text(&repo, "HEAD~1").unwrap();
        assert!(text.contains("diff --git a/a.txt b/a.txt"));
        assert!(text.contains("\n+two\n"));
    }

    #[test]
    fn test_read_diff_input_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("change.diff");
        std::fs::write(&path, "--- a/x\n+++ b/x\n").unwrap();

        assert_eq!(read_diff_input(&path).unwrap(), "--- a/x\n+++ b/x\n");
    }

    #[test]
    fn test_read_diff_input_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = read_diff_input(&dir.path().join("absent.diff")).unwrap_err();
        assert!(matches!(err, DiffError::ReadFailed(_)));
    }
}
