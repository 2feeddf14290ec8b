//! Layered configuration: defaults, environment credentials, global and project files.

mod ignore;
mod init;

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;

pub use ignore::IgnoreMatcher;
pub use init::{create_default_config, default_config_document};

/// Project configuration file name, looked up at the repository root.
pub const PROJECT_CONFIG_FILE: &str = ".doctr.toml";

pub const DEFAULT_MODEL: &str = "claude-3-5-haiku-20241022";
pub const DEFAULT_OUTPUT_DIR: &str = "docs";
pub const DEFAULT_DIFF_TARGET: &str = "HEAD~1";

pub const DEFAULT_IGNORE_PATTERNS: &[&str] = &[
    "*.pyc",
    "*.pyo",
    "__pycache__/*",
    ".git/*",
    "node_modules/*",
    "*.log",
    "*.tmp",
];

/// Output flavour of generated documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Markdown,
    Mdx,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Markdown => "md",
            OutputFormat::Mdx => "mdx",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Markdown => write!(f, "markdown"),
            OutputFormat::Mdx => write!(f, "mdx"),
        }
    }
}

/// Provider API keys. `Debug` never prints the values.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub anthropic_api_key: Option<String>,
    #[serde(default)]
    pub openai_api_key: Option<String>,
}

impl Credentials {
    /// Read `ANTHROPIC_API_KEY` and `OPENAI_API_KEY`, treating empty values as unset.
    pub fn from_env() -> Self {
        let read = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        Self {
            anthropic_api_key: read("ANTHROPIC_API_KEY"),
            openai_api_key: read("OPENAI_API_KEY"),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.anthropic_api_key.is_none() && self.openai_api_key.is_none()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |key: &Option<String>| key.as_ref().map(|_| "<redacted>");
        f.debug_struct("Credentials")
            .field("anthropic_api_key", &redact(&self.anthropic_api_key))
            .field("openai_api_key", &redact(&self.openai_api_key))
            .finish()
    }
}

/// Effective doctr configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
    #[serde(default = "default_model")]
    pub default_model: String,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_diff_target")]
    pub default_diff_target: String,
    #[serde(default = "default_true")]
    pub use_ai: bool,
    #[serde(default)]
    pub output_format: OutputFormat,
    #[serde(default = "default_ignore_patterns")]
    pub ignore_patterns: Vec<String>,
    #[serde(default = "default_true")]
    pub include_usage_examples: bool,
    #[serde(default = "default_true")]
    pub include_migration_guide: bool,
    #[serde(default = "default_true")]
    pub include_changelog: bool,
    #[serde(flatten)]
    pub credentials: Credentials,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_DIR)
}

fn default_diff_target() -> String {
    DEFAULT_DIFF_TARGET.to_string()
}

fn default_true() -> bool {
    true
}

fn default_ignore_patterns() -> Vec<String> {
    DEFAULT_IGNORE_PATTERNS.iter().map(|p| p.to_string()).collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_model: default_model(),
            output_dir: default_output_dir(),
            default_diff_target: default_diff_target(),
            use_ai: true,
            output_format: OutputFormat::default(),
            ignore_patterns: default_ignore_patterns(),
            include_usage_examples: true,
            include_migration_guide: true,
            include_changelog: true,
            credentials: Credentials::default(),
        }
    }
}

impl Config {
    /// Compile `ignore_patterns` into a matcher.
    pub fn ignore_matcher(&self) -> Result<IgnoreMatcher, ConfigError> {
        IgnoreMatcher::new(&self.ignore_patterns)
    }

    /// Resolve `output_dir` against the repository root when it is relative.
    pub fn output_dir_in(&self, repo_root: &Path) -> PathBuf {
        if self.output_dir.is_absolute() {
            self.output_dir.clone()
        } else {
            repo_root.join(&self.output_dir)
        }
    }
}

/// Path of the user-wide config file, `~/.doctr/config.toml`.
pub fn global_config_path() -> Option<PathBuf> {
    dirs_next::home_dir().map(|home| home.join(".doctr").join("config.toml"))
}

/// Load configuration for the repository at `repo_root`.
pub fn load_config(repo_root: &Path) -> Result<Config, ConfigError> {
    load_config_from(
        global_config_path().as_deref(),
        &repo_root.join(PROJECT_CONFIG_FILE),
        Credentials::from_env(),
    )
}

/// Merge defaults, `env` credentials, the global file and the project file.
///
/// Later layers override earlier ones key by key; missing files are skipped.
pub fn load_config_from(
    global: Option<&Path>,
    project: &Path,
    env: Credentials,
) -> Result<Config, ConfigError> {
    let mut merged = toml::Table::new();

    if let Some(key) = env.anthropic_api_key {
        merged.insert("anthropic_api_key".to_string(), toml::Value::String(key));
    }
    if let Some(key) = env.openai_api_key {
        merged.insert("openai_api_key".to_string(), toml::Value::String(key));
    }

    for path in global.into_iter().chain(std::iter::once(project)) {
        if let Some(layer) = read_layer(path)? {
            debug!("Applying config layer {}", path.display());
            merged.extend(layer);
        }
    }

    toml::Value::Table(merged)
        .try_into()
        .map_err(ConfigError::InvalidValue)
}

fn read_layer(path: &Path) -> Result<Option<toml::Table>, ConfigError> {
    if !path.is_file() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
        path: path.to_path_buf(),
        source,
    })?;
    let table = content
        .parse::<toml::Table>()
        .map_err(|source| ConfigError::ParseFailed {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(Some(table))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_when_no_files() {
        let dir = TempDir::new().unwrap();
        let config =
            load_config_from(None, &dir.path().join(".doctr.toml"), Credentials::default())
                .unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.default_model, "claude-3-5-haiku-20241022");
        assert_eq!(config.output_dir, PathBuf::from("docs"));
        assert_eq!(config.default_diff_target, "HEAD~1");
        assert!(config.use_ai);
        assert_eq!(config.ignore_patterns.len(), 7);
    }

    #[test]
    fn test_project_overrides_global_key_by_key() {
        let dir = TempDir::new().unwrap();
        let global = dir.path().join("global.toml");
        let project = dir.path().join(".doctr.toml");
        std::fs::write(&global, "default_model = \"gpt-4o\"\noutput_dir = \"site\"\n").unwrap();
        std::fs::write(&project, "output_dir = \"handbook\"\nuse_ai = false\n").unwrap();

        let config = load_config_from(Some(&global), &project, Credentials::default()).unwrap();
        assert_eq!(config.default_model, "gpt-4o");
        assert_eq!(config.output_dir, PathBuf::from("handbook"));
        assert!(!config.use_ai);
    }

    #[test]
    fn test_file_keys_override_environment_credentials() {
        let dir = TempDir::new().unwrap();
        let project = dir.path().join(".doctr.toml");
        std::fs::write(&project, "anthropic_api_key = \"from-file\"\n").unwrap();

        let env = Credentials {
            anthropic_api_key: Some("from-env".to_string()),
            openai_api_key: Some("openai-env".to_string()),
        };
        let config = load_config_from(None, &project, env).unwrap();
        assert_eq!(
            config.credentials.anthropic_api_key.as_deref(),
            Some("from-file")
        );
        assert_eq!(
            config.credentials.openai_api_key.as_deref(),
            Some("openai-env")
        );
    }

    #[test]
    fn test_mdx_output_format() {
        let dir = TempDir::new().unwrap();
        let project = dir.path().join(".doctr.toml");
        std::fs::write(&project, "output_format = \"mdx\"\n").unwrap();

        let config = load_config_from(None, &project, Credentials::default()).unwrap();
        assert_eq!(config.output_format, OutputFormat::Mdx);
        assert_eq!(config.output_format.extension(), "mdx");
    }

    #[test]
    fn test_parse_error_names_the_file() {
        let dir = TempDir::new().unwrap();
        let project = dir.path().join(".doctr.toml");
        std::fs::write(&project, "use_ai = [unterminated\n").unwrap();

        let err = load_config_from(None, &project, Credentials::default()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseFailed { ref path, .. } if path == &project));
    }

    #[test]
    fn test_wrong_value_type_is_invalid() {
        let dir = TempDir::new().unwrap();
        let project = dir.path().join(".doctr.toml");
        std::fs::write(&project, "use_ai = \"yes\"\n").unwrap();

        let err = load_config_from(None, &project, Credentials::default()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));
    }

    #[test]
    fn test_debug_redacts_credentials() {
        let creds = Credentials {
            anthropic_api_key: Some("sk-ant-secret".to_string()),
            openai_api_key: None,
        };
        let printed = format!("{:?}", creds);
        assert!(!printed.contains("sk-ant-secret"));
        assert!(printed.contains("<redacted>"));
    }

    #[test]
    fn test_output_dir_resolves_against_repo_root() {
        let config = Config::default();
        assert_eq!(
            config.output_dir_in(Path::new("/repo")),
            PathBuf::from("/repo/docs")
        );
    }
}
