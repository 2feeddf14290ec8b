//! Output file naming and atomic writes.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::config::OutputFormat;
use crate::error::WriteError;

/// Deterministic file name for a diff target, e.g. `HEAD~1` → `changes-head-1.md`.
pub fn filename_for_target(target: &str, format: OutputFormat) -> String {
    let slug = slugify(target);
    if slug.is_empty() {
        format!("changes.{}", format.extension())
    } else {
        format!("changes-{}.{}", slug, format.extension())
    }
}

/// Lower-case `text` and collapse runs of non-alphanumerics to single dashes.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;

    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

/// Write `content` to `dir/file_name`, replacing any previous file atomically.
///
/// Creates `dir` if needed. The content goes to a temp file in the same
/// directory which is then renamed over the target, so readers never see a
/// partial document.
pub fn write_document(dir: &Path, file_name: &str, content: &str) -> Result<PathBuf, WriteError> {
    std::fs::create_dir_all(dir).map_err(|source| WriteError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let path = dir.join(file_name);
    let write_err = |source| WriteError::WriteFailed {
        path: path.clone(),
        source,
    };

    let mut temp = NamedTempFile::new_in(dir).map_err(write_err)?;
    temp.write_all(content.as_bytes()).map_err(write_err)?;
    temp.as_file().sync_all().map_err(write_err)?;

    temp.persist(&path)
        .map_err(|source| WriteError::PersistFailed {
            path: path.clone(),
            source,
        })?;

    debug!("Wrote {} bytes to {}", content.len(), path.display());
    Ok(path)
}
