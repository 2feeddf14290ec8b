//! Project wiki: scan the tree, render pages, optionally enhance, write.

pub mod generate;
pub mod pages;
pub mod scanner;

pub use generate::{WikiReport, generate_wiki, write_wiki};
pub use pages::{WikiPage, build_pages, sidebar};
pub use scanner::{
    Language, ModuleInfo, ProjectStructure, ProjectType, SourceFile, Symbol, SymbolKind,
    scan_project,
};
