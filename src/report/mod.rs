//! Report rendering for aggregate summaries.

pub mod generator;
pub mod tables;

pub use generator::{generate_json_report, generate_markdown_report};
pub use tables::write_csv_tables;
