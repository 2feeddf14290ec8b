//! Diff collection and parsing.

mod collect;
mod model;
mod parser;

pub use collect::{collect_diff_text, diff_to_text, open_repository, read_diff_input};
pub use model::{ChangeKind, ChangeSet, FileChange, LineEdit};
pub use parser::parse_unified_diff;
