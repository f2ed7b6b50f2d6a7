//! Report rendering and exports.

pub mod export;
pub mod generator;

pub use export::{write_exports, ExportPaths};
pub use generator::{generate_json_report, generate_markdown_report, write_report, MarkdownOptions};
