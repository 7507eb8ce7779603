//! Suite results storage
//!
//! Persists suite runs as JSON and exports them for spreadsheets.

mod storage;

pub use storage::{ExportFormat, ResultsStorage, RunConfig, StoredRun};
