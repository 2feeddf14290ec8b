//! Change documentation: drafting, rendering and writing.

pub mod draft;
pub mod pipeline;
pub mod render;
pub mod writer;

pub use draft::{DocumentationDraft, DraftMetadata, DraftOptions};
pub use pipeline::{GenerateOptions, GenerateOutcome, generate_change_docs, render_document};
pub use render::Document;
pub use writer::{filename_for_target, slugify, write_document};
