//! Output formatting module
//!
//! Renders suite runs for the terminal and for export.

mod formatter;

pub use formatter::{OutputFormat, ResultFormatter};
