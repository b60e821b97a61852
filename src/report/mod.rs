//! Dashboard rendering.

pub mod generator;

pub use generator::{build_dashboard, generate_json_dashboard, generate_markdown_dashboard};
