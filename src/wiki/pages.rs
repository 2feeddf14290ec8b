//! Structure-only wiki pages rendered from a [`ProjectStructure`].

use super::scanner::{Language, ModuleInfo, ProjectStructure, display_path};

/// One wiki page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WikiPage {
    /// File stem, e.g. `Quick-Start` or `src-wiki-API`.
    pub name: String,
    pub title: String,
    /// Markdown, starting with a `# ` heading.
    pub content: String,
}

impl WikiPage {
    fn new(name: impl Into<String>, title: impl Into<String>, content: String) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            content,
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.md", self.name)
    }
}

/// All pages for `structure`, in sidebar order.
///
/// `Configuration` and `Testing` are only produced when the scan found
/// config files or test directories.
pub fn build_pages(structure: &ProjectStructure) -> Vec<WikiPage> {
    let mut pages = vec![
        home_page(structure),
        installation_page(structure),
        quick_start_page(structure),
    ];
    pages.extend(structure.modules.iter().map(api_page));
    pages.push(architecture_page(structure));
    pages.push(development_page(structure));
    if !structure.config_files.is_empty() {
        pages.push(configuration_page(structure));
    }
    if !structure.test_dirs.is_empty() {
        pages.push(testing_page(structure));
    }
    pages
}

/// `_Sidebar.md` content linking every page.
pub fn sidebar(pages: &[WikiPage]) -> String {
    let mut out = String::from("## Contents\n\n");
    for page in pages {
        out.push_str(&format!("- [{}]({})\n", page.title, page.file_name()));
    }
    out
}

pub fn api_page_name(module: &ModuleInfo) -> String {
    format!("{}-API", module.name.replace(['/', ' '], "-"))
}

fn home_page(structure: &ProjectStructure) -> WikiPage {
    let mut content = format!("# {}\n\n## Overview\n\n", structure.name);
    content.push_str(&format!(
        "This is a {} project with {} module(s) and {} source file(s).\n\n",
        structure.main_language_name(),
        structure.modules.len(),
        structure.source_file_count()
    ));

    if !structure.modules.is_empty() {
        content.push_str("## Project Structure\n\n");
        for module in &structure.modules {
            content.push_str(&format!(
                "- **{}**: {} file(s) ([API]({}.md))\n",
                module.name,
                module.files.len(),
                api_page_name(module)
            ));
        }
        content.push('\n');
    }

    content.push_str("## Documentation\n\n");
    content.push_str("- [Installation](Installation.md)\n");
    content.push_str("- [Quick Start](Quick-Start.md)\n");
    content.push_str("- [Architecture](Architecture.md)\n");
    content.push_str("- [Development](Development.md)\n");
    if !structure.config_files.is_empty() {
        content.push_str("- [Configuration](Configuration.md)\n");
    }
    if !structure.test_dirs.is_empty() {
        content.push_str("- [Testing](Testing.md)\n");
    }

    WikiPage::new("Home", structure.name.clone(), content)
}

fn installation_page(structure: &ProjectStructure) -> WikiPage {
    let mut content = String::from("# Installation\n\n");
    let commands = match structure.main_language {
        Some(Language::Rust) => Some(("a recent stable Rust toolchain", "cargo install --path .")),
        Some(Language::Python) => Some(("Python 3 with pip", "pip install -e .")),
        Some(Language::Go) => Some(("a Go toolchain", "go build ./...")),
        Some(Language::JavaScript | Language::TypeScript) => Some(("Node.js with npm", "npm install")),
        None => None,
    };

    match commands {
        Some((requirement, install)) => {
            content.push_str(&format!("## Requirements\n\n- {}\n\n", requirement));
            content.push_str("## Install from Source\n\n```bash\n");
            content.push_str(&format!(
                "git clone <repository-url>\ncd {}\n{}\n```\n",
                structure.name, install
            ));
        }
        None => content.push_str("Installation steps could not be inferred from the project files.\n"),
    }

    WikiPage::new("Installation", "Installation", content)
}

fn quick_start_page(structure: &ProjectStructure) -> WikiPage {
    let mut content = String::from("# Quick Start\n\n");

    if !structure.entry_points.is_empty() {
        content.push_str("## Entry Points\n\n");
        for entry in &structure.entry_points {
            content.push_str(&format!("- `{}`\n", display_path(entry)));
        }
        content.push('\n');
    }

    let run = match structure.main_language {
        Some(Language::Rust) => Some("cargo run -- --help".to_string()),
        Some(Language::Go) => Some("go run .".to_string()),
        Some(Language::JavaScript | Language::TypeScript) => Some("npm start".to_string()),
        Some(Language::Python) => structure
            .entry_points
            .iter()
            .find(|p| p.extension().is_some_and(|e| e == "py"))
            .map(|p| format!("python {}", display_path(p))),
        None => None,
    };
    if let Some(run) = run {
        content.push_str(&format!("## Basic Usage\n\n```bash\n{}\n```\n", run));
    } else {
        content.push_str(&format!(
            "## Basic Usage\n\nSee the [Home](Home.md) page for an overview of {}.\n",
            structure.name
        ));
    }

    WikiPage::new("Quick-Start", "Quick Start", content)
}

fn api_page(module: &ModuleInfo) -> WikiPage {
    let title = format!("{} API", module.name);
    let location = if module.path.as_os_str().is_empty() {
        ".".to_string()
    } else {
        display_path(&module.path)
    };

    let mut content = format!("# {}\n\n## Overview\n\nModule location: `{}`\n\n", title, location);

    if !module.public_api.is_empty() {
        content.push_str("## Public API\n\n");
        for item in &module.public_api {
            content.push_str(&format!("- `{}`\n", item));
        }
        content.push('\n');
    }

    content.push_str("## Files\n\n");
    for file in &module.files {
        content.push_str(&format!("### {}\n\n", display_path(&file.path)));
        let functions: Vec<&str> = file.functions().collect();
        let types: Vec<&str> = file.types().collect();
        if functions.is_empty() && types.is_empty() {
            content.push_str("No top-level definitions found.\n\n");
            continue;
        }
        if !functions.is_empty() {
            content.push_str("**Functions:**\n");
            for f in functions {
                content.push_str(&format!("- `{}()`\n", f));
            }
            content.push('\n');
        }
        if !types.is_empty() {
            content.push_str("**Types:**\n");
            for t in types {
                content.push_str(&format!("- `{}`\n", t));
            }
            content.push('\n');
        }
    }

    WikiPage::new(api_page_name(module), title, content)
}

fn architecture_page(structure: &ProjectStructure) -> WikiPage {
    let mut content = String::from("# Architecture\n\n## Project Overview\n\n");
    content.push_str(&format!("- **Type**: {}\n", structure.project_type));
    content.push_str(&format!("- **Language**: {}\n", structure.main_language_name()));
    content.push_str(&format!("- **Modules**: {}\n\n", structure.modules.len()));

    if !structure.modules.is_empty() {
        content.push_str("## Module Structure\n\n");
        for module in &structure.modules {
            content.push_str(&format!("### {}\n\n", module.name));
            content.push_str(&format!("- Files: {}\n", module.files.len()));
            if !module.public_api.is_empty() {
                content.push_str(&format!("- Public items: {}\n", module.public_api.len()));
            }
            content.push('\n');
        }
    }

    if !structure.entry_points.is_empty() {
        content.push_str("## Entry Points\n\n");
        for entry in &structure.entry_points {
            content.push_str(&format!("- `{}`\n", display_path(entry)));
        }
    }

    WikiPage::new("Architecture", "Architecture", content)
}

fn development_page(structure: &ProjectStructure) -> WikiPage {
    let mut content = String::from("# Development\n\n## Setup\n\n");
    let setup = match structure.main_language {
        Some(Language::Rust) => Some("cargo build"),
        Some(Language::Python) => Some(
            "python -m venv venv\nsource venv/bin/activate\npip install -r requirements.txt\npip install -e .",
        ),
        Some(Language::Go) => Some("go mod download\ngo build ./..."),
        Some(Language::JavaScript | Language::TypeScript) => Some("npm install"),
        None => None,
    };
    match setup {
        Some(commands) => content.push_str(&format!("```bash\n{}\n```\n\n", commands)),
        None => content.push_str("No build tooling was detected.\n\n"),
    }

    if !structure.modules.is_empty() {
        content.push_str("## Project Layout\n\n");
        for module in &structure.modules {
            content.push_str(&format!("- `{}`: {} file(s)\n", module.name, module.files.len()));
        }
        content.push('\n');
    }

    if structure.dependencies.values().any(|d| !d.is_empty()) {
        content.push_str("## Dependencies\n\n");
        for (manifest, deps) in &structure.dependencies {
            content.push_str(&format!("### {}\n\n", manifest));
            for dep in deps {
                content.push_str(&format!("- `{}`\n", dep));
            }
            content.push('\n');
        }
    }

    WikiPage::new("Development", "Development", content)
}

fn configuration_page(structure: &ProjectStructure) -> WikiPage {
    let mut content =
        String::from("# Configuration\n\nThis project uses the following configuration files.\n\n");

    for path in &structure.config_files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        content.push_str(&format!("## {}\n\nLocation: `{}`\n\n", name, display_path(path)));
        if let Some(description) = describe_config(&name) {
            content.push_str(&format!("{}\n\n", description));
        }
    }

    WikiPage::new("Configuration", "Configuration", content)
}

fn describe_config(name: &str) -> Option<&'static str> {
    let description = match name {
        "Cargo.toml" => "Rust package manifest.",
        "pyproject.toml" | "setup.py" | "setup.cfg" => "Python packaging configuration.",
        "requirements.txt" => "Python dependencies.",
        "package.json" => "Node.js package manifest.",
        "tsconfig.json" => "TypeScript compiler options.",
        "go.mod" => "Go module definition.",
        "Makefile" => "Build tasks.",
        "Dockerfile" => "Container image definition.",
        _ if name.starts_with("docker-compose") => "Container orchestration.",
        _ if name.ends_with(".toml") => "TOML configuration file.",
        _ if name.ends_with(".yaml") || name.ends_with(".yml") => "YAML configuration file.",
        _ if name.ends_with(".ini") || name.ends_with(".cfg") => "INI-style configuration file.",
        _ => return None,
    };
    Some(description)
}

fn testing_page(structure: &ProjectStructure) -> WikiPage {
    let mut content =
        String::from("# Testing\n\n## Test Locations\n\nTests live in the following directories:\n\n");
    for dir in &structure.test_dirs {
        let shown = if dir.as_os_str().is_empty() {
            ".".to_string()
        } else {
            display_path(dir)
        };
        content.push_str(&format!("- `{}`\n", shown));
    }
    content.push('\n');

    let commands = match structure.main_language {
        Some(Language::Rust) => Some("# Run all tests\ncargo test\n\n# Run one test by name\ncargo test <name>"),
        Some(Language::Python) => {
            Some("# Run all tests\npytest\n\n# Without pytest\npython -m unittest discover")
        }
        Some(Language::Go) => Some("# Run all tests\ngo test ./...\n\n# With coverage\ngo test -cover ./..."),
        Some(Language::JavaScript | Language::TypeScript) => Some("npm test"),
        None => None,
    };
    if let Some(commands) = commands {
        content.push_str(&format!("## Running Tests\n\n```bash\n{}\n```\n", commands));
    }

    WikiPage::new("Testing", "Testing", content)
}
