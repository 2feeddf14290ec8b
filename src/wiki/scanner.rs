//! Project tree scanning for wiki generation.
//!
//! Walks the tree with the `ignore` crate and extracts a coarse picture of
//! the project: languages, modules with their top-level symbols, entry
//! points, config files, test directories and docs. Symbols come from
//! line-based patterns, not a parser.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use ignore::WalkBuilder;
use regex_lite::Regex;
use tracing::{debug, warn};

use crate::config::IgnoreMatcher;
use crate::error::WikiError;

/// Deepest directory level visited below the root.
const MAX_DEPTH: usize = 8;

/// Source files larger than this are counted but not scanned for symbols.
const MAX_SOURCE_BYTES: u64 = 512 * 1024;

/// Public API entries listed per module in the overview.
const OVERVIEW_API_LIMIT: usize = 20;

/// Dependency and build output directories, skipped wherever they appear.
const SKIP_DIRS: &[&str] = &[
    "target",
    "node_modules",
    "venv",
    "__pycache__",
    "site-packages",
    "dist",
    "build",
    "vendor",
];

const CONFIG_FILE_NAMES: &[&str] = &[
    "Cargo.toml",
    "pyproject.toml",
    "setup.py",
    "setup.cfg",
    "requirements.txt",
    "package.json",
    "tsconfig.json",
    "go.mod",
    "Makefile",
    "Dockerfile",
];

const CONFIG_EXTENSIONS: &[&str] = &["toml", "yaml", "yml", "ini", "cfg"];

const ENTRY_POINT_NAMES: &[&str] = &[
    "main.rs",
    "main.py",
    "__main__.py",
    "app.py",
    "main.go",
    "index.js",
    "index.ts",
];

const DOC_PREFIXES: &[&str] = &["README", "CHANGELOG", "LICENSE", "CONTRIBUTING"];

/// Source languages the scanner understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Language {
    Rust,
    Python,
    Go,
    JavaScript,
    TypeScript,
}

impl Language {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "rs" => Some(Language::Rust),
            "py" => Some(Language::Python),
            "go" => Some(Language::Go),
            "js" | "jsx" | "mjs" | "cjs" => Some(Language::JavaScript),
            "ts" | "tsx" | "mts" | "cts" => Some(Language::TypeScript),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Rust => "rust",
            Language::Python => "python",
            Language::Go => "go",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
        }
    }

    /// JavaScript and TypeScript share a toolchain and count as one family.
    fn family(&self) -> Language {
        match self {
            Language::TypeScript => Language::JavaScript,
            other => *other,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse classification of the project by its source languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectType {
    Single(Language),
    Mixed,
    Unknown,
}

impl ProjectType {
    fn classify(counts: &BTreeMap<Language, usize>, main: Option<Language>) -> Self {
        let families: BTreeSet<Language> = counts.keys().map(Language::family).collect();
        match (families.len(), main) {
            (0, _) | (_, None) => ProjectType::Unknown,
            (1, Some(lang)) => ProjectType::Single(lang),
            _ => ProjectType::Mixed,
        }
    }
}

impl fmt::Display for ProjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectType::Single(lang) => write!(f, "{}", lang),
            ProjectType::Mixed => f.write_str("mixed"),
            ProjectType::Unknown => f.write_str("unknown"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Function,
    Type,
}

/// A top-level definition found in a source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub public: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path relative to the project root.
    pub path: PathBuf,
    pub language: Language,
    pub symbols: Vec<Symbol>,
}

impl SourceFile {
    pub fn functions(&self) -> impl Iterator<Item = &str> {
        self.symbols_of(SymbolKind::Function)
    }

    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.symbols_of(SymbolKind::Type)
    }

    fn symbols_of(&self, kind: SymbolKind) -> impl Iterator<Item = &str> {
        self.symbols
            .iter()
            .filter(move |s| s.kind == kind)
            .map(|s| s.name.as_str())
    }
}

/// A directory holding source files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleInfo {
    /// Relative directory path with `/` separators, or the project name for
    /// files at the root.
    pub name: String,
    /// Directory relative to the project root (empty for the root).
    pub path: PathBuf,
    pub files: Vec<SourceFile>,
    /// Public symbol names, or the names listed in a Python `__all__`.
    pub public_api: Vec<String>,
}

/// Everything the wiki pages are rendered from.
#[derive(Debug, Clone)]
pub struct ProjectStructure {
    pub name: String,
    pub root: PathBuf,
    pub main_language: Option<Language>,
    pub project_type: ProjectType,
    pub language_counts: BTreeMap<Language, usize>,
    pub modules: Vec<ModuleInfo>,
    pub entry_points: Vec<PathBuf>,
    pub config_files: Vec<PathBuf>,
    pub test_dirs: Vec<PathBuf>,
    pub doc_files: Vec<PathBuf>,
    /// Declared dependencies keyed by manifest file name.
    pub dependencies: BTreeMap<String, Vec<String>>,
}

impl ProjectStructure {
    pub fn main_language_name(&self) -> &'static str {
        self.main_language.map(|l| l.as_str()).unwrap_or("unknown")
    }

    pub fn source_file_count(&self) -> usize {
        self.language_counts.values().sum()
    }

    /// Plain-text summary used as prompt context.
    pub fn overview(&self) -> String {
        let mut out = format!("Project: {}\n", self.name);
        out.push_str(&format!("Type: {}\n", self.project_type));
        out.push_str(&format!("Main language: {}\n", self.main_language_name()));
        if !self.language_counts.is_empty() {
            let counts: Vec<String> = self
                .language_counts
                .iter()
                .map(|(lang, n)| format!("{} ({})", lang, n))
                .collect();
            out.push_str(&format!("Source files: {}\n", counts.join(", ")));
        }

        out.push_str(&format!("Modules ({}):\n", self.modules.len()));
        for module in &self.modules {
            out.push_str(&format!("- {} ({} files)", module.name, module.files.len()));
            if !module.public_api.is_empty() {
                let shown: Vec<&str> = module
                    .public_api
                    .iter()
                    .take(OVERVIEW_API_LIMIT)
                    .map(String::as_str)
                    .collect();
                out.push_str(&format!(": {}", shown.join(", ")));
                if module.public_api.len() > OVERVIEW_API_LIMIT {
                    out.push_str(", ...");
                }
            }
            out.push('\n');
        }

        push_path_line(&mut out, "Entry points", &self.entry_points);
        push_path_line(&mut out, "Config files", &self.config_files);
        push_path_line(&mut out, "Test directories", &self.test_dirs);
        push_path_line(&mut out, "Documentation", &self.doc_files);
        for (manifest, deps) in &self.dependencies {
            if !deps.is_empty() {
                out.push_str(&format!("Dependencies ({}): {}\n", manifest, deps.join(", ")));
            }
        }
        out
    }
}

fn push_path_line(out: &mut String, label: &str, paths: &[PathBuf]) {
    if paths.is_empty() {
        return;
    }
    let shown: Vec<String> = paths.iter().map(|p| display_path(p)).collect();
    out.push_str(&format!("{}: {}\n", label, shown.join(", ")));
}

/// Relative path with `/` separators on every platform.
pub fn display_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Scan the project rooted at `root`.
///
/// Honours `.gitignore` (even outside a Git work tree), skips hidden and
/// dependency directories and anything `ignore` matches. Unreadable entries
/// below the root are logged and skipped.
pub fn scan_project(root: &Path, ignore: &IgnoreMatcher) -> Result<ProjectStructure, WikiError> {
    if !root.is_dir() {
        return Err(WikiError::NotADirectory(root.to_path_buf()));
    }

    let mut builder = WalkBuilder::new(root);
    builder
        .git_ignore(true)
        .require_git(false)
        .hidden(true)
        .max_depth(Some(MAX_DEPTH))
        .sort_by_file_name(|a, b| a.cmp(b));

    let filter_root = root.to_path_buf();
    let filter_ignore = ignore.clone();
    builder.filter_entry(move |entry| {
        if entry.depth() == 0 {
            return true;
        }
        let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
        if is_dir
            && entry
                .file_name()
                .to_str()
                .is_some_and(|name| SKIP_DIRS.contains(&name))
        {
            return false;
        }
        let rel = entry.path().strip_prefix(&filter_root).unwrap_or(entry.path());
        !filter_ignore.is_ignored_path(rel)
    });

    let mut scan = Scan::default();
    let mut seen_root = false;
    let mut first_error = None;

    for result in builder.build() {
        let entry = match result {
            Ok(entry) => entry,
            Err(err) => {
                warn!("Skipping unreadable entry: {}", err);
                first_error.get_or_insert(err);
                continue;
            }
        };
        if entry.depth() == 0 {
            seen_root = true;
            continue;
        }
        let Ok(rel) = entry.path().strip_prefix(root) else {
            continue;
        };
        let rel = rel.to_path_buf();

        match entry.file_type() {
            Some(t) if t.is_dir() => scan.visit_dir(&rel),
            Some(t) if t.is_file() => scan.visit_file(entry.path(), &rel),
            _ => {}
        }
    }

    if !seen_root && let Some(err) = first_error {
        return Err(WikiError::WalkFailed(err));
    }

    let name = project_name(root);
    let structure = scan.finish(name, root);
    debug!(
        "Scanned {}: {} source file(s), {} module(s)",
        structure.name,
        structure.source_file_count(),
        structure.modules.len()
    );
    Ok(structure)
}

fn project_name(root: &Path) -> String {
    let resolved = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
    resolved
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "project".to_string())
}

/// Accumulator filled while walking.
#[derive(Default)]
struct Scan {
    language_counts: BTreeMap<Language, usize>,
    modules: BTreeMap<PathBuf, Vec<SourceFile>>,
    /// Names from `__all__` in `__init__.py`, keyed by directory.
    declared_api: BTreeMap<PathBuf, Vec<String>>,
    entry_points: BTreeSet<PathBuf>,
    config_files: BTreeSet<PathBuf>,
    test_dirs: BTreeSet<PathBuf>,
    doc_files: BTreeSet<PathBuf>,
    dependencies: BTreeMap<String, Vec<String>>,
}

impl Scan {
    fn visit_dir(&mut self, rel: &Path) {
        let is_test_dir = rel
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| name.starts_with("test") || name == "__tests__");
        if is_test_dir {
            self.test_dirs.insert(rel.to_path_buf());
        }
    }

    fn visit_file(&mut self, abs: &Path, rel: &Path) {
        let Some(file_name) = rel.file_name().and_then(|n| n.to_str()) else {
            return;
        };
        let dir = rel.parent().map(Path::to_path_buf).unwrap_or_default();

        if is_config_file(file_name) {
            self.config_files.insert(rel.to_path_buf());
            if dir.as_os_str().is_empty() {
                self.read_manifest(abs, file_name);
            }
        }
        if is_doc_file(rel, file_name) {
            self.doc_files.insert(rel.to_path_buf());
        }
        if is_test_file(file_name) {
            self.test_dirs.insert(dir.clone());
        }
        if ENTRY_POINT_NAMES.contains(&file_name)
            || rel.parent().is_some_and(|p| p.ends_with("src/bin"))
        {
            self.entry_points.insert(rel.to_path_buf());
        }

        let Some(language) = Language::from_path(rel) else {
            return;
        };
        *self.language_counts.entry(language).or_default() += 1;

        let source = read_source(abs);
        let symbols = source
            .as_deref()
            .map(|text| extract_symbols(language, text))
            .unwrap_or_default();

        if let Some(text) = source.as_deref() {
            if language == Language::Python && has_main_guard(text) {
                self.entry_points.insert(rel.to_path_buf());
            }
            if file_name == "__init__.py"
                && let Some(names) = python_all(text)
            {
                self.declared_api.insert(dir.clone(), names);
            }
        }

        self.modules.entry(dir).or_default().push(SourceFile {
            path: rel.to_path_buf(),
            language,
            symbols,
        });
    }

    fn read_manifest(&mut self, abs: &Path, file_name: &str) {
        let Ok(text) = std::fs::read_to_string(abs) else {
            return;
        };
        let deps = match file_name {
            "Cargo.toml" => cargo_dependencies(&text),
            "pyproject.toml" => pyproject_dependencies(&text),
            "package.json" => package_json_dependencies(&text),
            "requirements.txt" => requirements_dependencies(&text),
            "go.mod" => go_mod_dependencies(&text),
            _ => return,
        };
        if !deps.is_empty() {
            self.dependencies.insert(file_name.to_string(), deps);
        }
    }

    fn finish(self, name: String, root: &Path) -> ProjectStructure {
        let main_language = self
            .language_counts
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
            .map(|(lang, _)| *lang);
        let project_type = ProjectType::classify(&self.language_counts, main_language);

        let mut declared_api = self.declared_api;
        let modules = self
            .modules
            .into_iter()
            .map(|(path, files)| {
                let public_api = declared_api
                    .remove(&path)
                    .unwrap_or_else(|| public_symbols(&files));
                let module_name = if path.as_os_str().is_empty() {
                    name.clone()
                } else {
                    display_path(&path)
                };
                ModuleInfo {
                    name: module_name,
                    path,
                    files,
                    public_api,
                }
            })
            .collect();

        ProjectStructure {
            name,
            root: root.to_path_buf(),
            main_language,
            project_type,
            language_counts: self.language_counts,
            modules,
            entry_points: self.entry_points.into_iter().collect(),
            config_files: self.config_files.into_iter().collect(),
            test_dirs: self.test_dirs.into_iter().collect(),
            doc_files: self.doc_files.into_iter().collect(),
            dependencies: self.dependencies,
        }
    }
}

fn public_symbols(files: &[SourceFile]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    files
        .iter()
        .flat_map(|f| f.symbols.iter())
        .filter(|s| s.public && seen.insert(s.name.clone()))
        .map(|s| s.name.clone())
        .collect()
}

fn read_source(path: &Path) -> Option<String> {
    let size = std::fs::metadata(path).ok()?.len();
    if size > MAX_SOURCE_BYTES {
        debug!("Not scanning {} ({} bytes)", path.display(), size);
        return None;
    }
    match std::fs::read(path) {
        Ok(bytes) => String::from_utf8(bytes).ok(),
        Err(e) => {
            warn!("Failed to read {}: {}", path.display(), e);
            None
        }
    }
}

fn is_config_file(file_name: &str) -> bool {
    if CONFIG_FILE_NAMES.contains(&file_name) || file_name.starts_with("docker-compose") {
        return true;
    }
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| CONFIG_EXTENSIONS.contains(&ext))
}

fn is_doc_file(rel: &Path, file_name: &str) -> bool {
    let upper = file_name.to_ascii_uppercase();
    DOC_PREFIXES.iter().any(|p| upper.starts_with(p))
        || file_name.ends_with(".md")
        || rel.starts_with("docs")
}

fn is_test_file(file_name: &str) -> bool {
    let Some((stem, ext)) = file_name.rsplit_once('.') else {
        return false;
    };
    match ext {
        "py" => stem.starts_with("test_") || stem.ends_with("_test"),
        "go" => stem.ends_with("_test"),
        "js" | "jsx" | "ts" | "tsx" => stem.ends_with(".test") || stem.ends_with(".spec"),
        _ => false,
    }
}

fn has_main_guard(text: &str) -> bool {
    text.contains("if __name__ == \"__main__\"") || text.contains("if __name__ == '__main__'")
}

static RUST_FN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^\s*(pub(?:\([^)]*\))?\s+)?(?:default\s+)?(?:const\s+)?(?:async\s+)?(?:unsafe\s+)?(?:extern\s+"[^"]*"\s+)?fn\s+([A-Za-z_]\w*)"#,
    )
    .expect("valid regex")
});

static RUST_TYPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(pub(?:\([^)]*\))?\s+)?(?:unsafe\s+)?(?:struct|enum|trait|type|union)\s+([A-Za-z_]\w*)")
        .expect("valid regex")
});

static PY_DEF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\s*)(?:async\s+)?def\s+([A-Za-z_]\w*)").expect("valid regex")
});

static PY_CLASS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*)class\s+([A-Za-z_]\w*)").expect("valid regex"));

static PY_ALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)__all__\s*=\s*[\[(](.*?)[\])]").expect("valid regex"));

static QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"["']([^"']+)["']"#).expect("valid regex"));

static GO_FUNC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^func\s+([A-Za-z_]\w*)").expect("valid regex"));

static GO_TYPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^type\s+([A-Za-z_]\w*)").expect("valid regex"));

static JS_FUNC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(export\s+)?(?:default\s+)?(?:async\s+)?function\*?\s+([A-Za-z_$][\w$]*)")
        .expect("valid regex")
});

static JS_ARROW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(export\s+)?const\s+([A-Za-z_$][\w$]*)\s*=\s*(?:async\s+)?(?:\([^)]*\)|[A-Za-z_$][\w$]*)\s*=>")
        .expect("valid regex")
});

static JS_TYPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(export\s+)?(?:default\s+)?(?:abstract\s+)?(?:class|interface|type|enum)\s+([A-Za-z_$][\w$]*)",
    )
    .expect("valid regex")
});

/// Extract top-level definitions from `text`.
pub fn extract_symbols(language: Language, text: &str) -> Vec<Symbol> {
    let mut symbols = Vec::new();
    for line in text.lines() {
        if let Some(symbol) = match_line(language, line) {
            symbols.push(symbol);
        }
    }
    symbols
}

fn match_line(language: Language, line: &str) -> Option<Symbol> {
    let symbol = |name: &str, kind, public| Symbol {
        name: name.to_string(),
        kind,
        public,
    };

    match language {
        Language::Rust => {
            if let Some(caps) = RUST_FN.captures(line) {
                return Some(symbol(&caps[2], SymbolKind::Function, is_plain_pub(caps.get(1))));
            }
            RUST_TYPE
                .captures(line)
                .map(|caps| symbol(&caps[2], SymbolKind::Type, is_plain_pub(caps.get(1))))
        }
        Language::Python => {
            let public = |indent: &str, name: &str| indent.is_empty() && !name.starts_with('_');
            if let Some(caps) = PY_DEF.captures(line) {
                // Methods are recorded as non-public functions.
                return Some(symbol(&caps[2], SymbolKind::Function, public(&caps[1], &caps[2])));
            }
            PY_CLASS
                .captures(line)
                .map(|caps| symbol(&caps[2], SymbolKind::Type, public(&caps[1], &caps[2])))
        }
        Language::Go => {
            let exported = |name: &str| name.chars().next().is_some_and(char::is_uppercase);
            if let Some(caps) = GO_FUNC.captures(line) {
                return Some(symbol(&caps[1], SymbolKind::Function, exported(&caps[1])));
            }
            GO_TYPE
                .captures(line)
                .map(|caps| symbol(&caps[1], SymbolKind::Type, exported(&caps[1])))
        }
        Language::JavaScript | Language::TypeScript => {
            let line = line.trim_start();
            if let Some(caps) = JS_FUNC.captures(line).or_else(|| JS_ARROW.captures(line)) {
                return Some(symbol(&caps[2], SymbolKind::Function, caps.get(1).is_some()));
            }
            JS_TYPE
                .captures(line)
                .map(|caps| symbol(&caps[2], SymbolKind::Type, caps.get(1).is_some()))
        }
    }
}

/// `pub(crate)` and friends are not part of the public API.
fn is_plain_pub(visibility: Option<regex_lite::Match<'_>>) -> bool {
    visibility.is_some_and(|m| m.as_str().trim() == "pub")
}

/// Names listed in a Python `__all__` assignment.
fn python_all(text: &str) -> Option<Vec<String>> {
    let caps = PY_ALL.captures(text)?;
    Some(
        QUOTED
            .captures_iter(&caps[1])
            .map(|c| c[1].to_string())
            .collect(),
    )
}

fn cargo_dependencies(text: &str) -> Vec<String> {
    let Ok(table) = text.parse::<toml::Table>() else {
        return Vec::new();
    };
    table
        .get("dependencies")
        .and_then(|v| v.as_table())
        .map(|deps| deps.keys().cloned().collect())
        .unwrap_or_default()
}

fn pyproject_dependencies(text: &str) -> Vec<String> {
    let Ok(table) = text.parse::<toml::Table>() else {
        return Vec::new();
    };
    table
        .get("project")
        .and_then(|p| p.get("dependencies"))
        .and_then(|d| d.as_array())
        .map(|deps| {
            deps.iter()
                .filter_map(|d| d.as_str())
                .map(|s| s.to_string())
                .collect()
        })
        .unwrap_or_default()
}

fn package_json_dependencies(text: &str) -> Vec<String> {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(text) else {
        return Vec::new();
    };
    value
        .get("dependencies")
        .and_then(|d| d.as_object())
        .map(|deps| deps.keys().cloned().collect())
        .unwrap_or_default()
}

fn requirements_dependencies(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#') && !l.starts_with('-'))
        .map(|l| l.to_string())
        .collect()
}

fn go_mod_dependencies(text: &str) -> Vec<String> {
    let mut deps = Vec::new();
    let mut in_block = false;
    for line in text.lines().map(str::trim) {
        if in_block {
            if line == ")" {
                in_block = false;
            } else if !line.is_empty() && !line.starts_with("//") {
                deps.push(line.to_string());
            }
        } else if line == "require (" {
            in_block = true;
        } else if let Some(dep) = line.strip_prefix("require ") {
            deps.push(dep.trim().to_string());
        }
    }
    deps
}
