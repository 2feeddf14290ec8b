//! `doctr init`: write a commented default `.doctr.toml`.

use std::path::{Path, PathBuf};

use toml_edit::{Array, DocumentMut, value};
use tracing::debug;

use crate::error::ConfigError;

use super::{
    DEFAULT_DIFF_TARGET, DEFAULT_IGNORE_PATTERNS, DEFAULT_MODEL, DEFAULT_OUTPUT_DIR,
    PROJECT_CONFIG_FILE,
};

/// Build the default project config, one comment per key.
pub fn default_config_document() -> DocumentMut {
    let mut doc = DocumentMut::new();

    doc["default_model"] = value(DEFAULT_MODEL);
    doc["output_dir"] = value(DEFAULT_OUTPUT_DIR);
    doc["default_diff_target"] = value(DEFAULT_DIFF_TARGET);
    doc["use_ai"] = value(true);
    doc["output_format"] = value("markdown");
    doc["include_usage_examples"] = value(true);
    doc["include_migration_guide"] = value(true);
    doc["include_changelog"] = value(true);

    let mut patterns = Array::new();
    for pattern in DEFAULT_IGNORE_PATTERNS {
        patterns.push(*pattern);
    }
    for item in patterns.iter_mut() {
        item.decor_mut().set_prefix("\n    ");
    }
    patterns.set_trailing("\n");
    patterns.set_trailing_comma(true);
    doc["ignore_patterns"] = value(patterns);

    let comments = [
        ("default_model", "# doctr configuration\n\n# Model used for AI enhancement (claude-* uses Anthropic, gpt-*/o1-* uses OpenAI)\n"),
        ("output_dir", "\n# Directory for generated documentation, relative to the repository root\n"),
        ("default_diff_target", "\n# Revision expression compared against the working tree\n"),
        ("use_ai", "\n# Set to false to always write structure-only documents\n"),
        ("output_format", "\n# \"markdown\" or \"mdx\"\n"),
        ("include_usage_examples", "\n# Sections suggested in generated documents\n"),
        ("ignore_patterns", "\n# Glob patterns for files excluded from analysis\n"),
    ];
    for (key, comment) in comments {
        if let Some(mut key) = doc.as_table_mut().key_mut(key) {
            key.leaf_decor_mut().set_prefix(comment);
        }
    }

    doc
}

/// Write the default config to `<repo_root>/.doctr.toml`.
///
/// Refuses to replace an existing file unless `force` is set.
pub fn create_default_config(repo_root: &Path, force: bool) -> Result<PathBuf, ConfigError> {
    let path = repo_root.join(PROJECT_CONFIG_FILE);
    if path.exists() && !force {
        return Err(ConfigError::AlreadyExists(path));
    }

    std::fs::write(&path, default_config_document().to_string())
        .map_err(ConfigError::WriteFailed)?;
    debug!("Wrote default config to {}", path.display());

    Ok(path)
}
