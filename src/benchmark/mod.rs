//! Benchmarking module
//!
//! Timed upstream calls, the append-only call log, per-operation
//! statistics, reports and the batch suite.

mod metrics;
mod recorder;
mod report;
mod runner;
mod suite;

pub use recorder::CallLog;
pub use report::{BenchmarkReport, ReportFormat, ReportOutcome};
pub use runner::Benchmarker;
pub use suite::{ApiSummary, CaseResult, SuiteReport, SuiteRunner};

#[cfg(test)]
pub use metrics::{DurationStats, ErrorStats};
#[cfg(test)]
pub use suite::{OverallStats, ResponseAnalysis};
