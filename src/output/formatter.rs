//! Output formatters for suite runs
//!
//! Provides table, JSON, CSV and one-line summary output.

use crate::benchmark::{ApiSummary, CaseResult, SuiteReport};

/// Output format options
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    JsonPretty,
    Csv,
    Summary,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "table" => Some(OutputFormat::Table),
            "json" => Some(OutputFormat::Json),
            "json-pretty" | "jsonpretty" => Some(OutputFormat::JsonPretty),
            "csv" => Some(OutputFormat::Csv),
            "summary" => Some(OutputFormat::Summary),
            _ => None,
        }
    }
}

/// Suite result formatter
pub struct ResultFormatter {
    format: OutputFormat,
    colorize: bool,
}

impl ResultFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            colorize: true,
        }
    }

    pub fn no_color(mut self) -> Self {
        self.colorize = false;
        self
    }

    /// Format a whole suite run
    pub fn format_report(&self, report: &SuiteReport) -> String {
        match self.format {
            OutputFormat::Table => self.format_table(report),
            OutputFormat::Json => serde_json::to_string(report).unwrap_or_default(),
            OutputFormat::JsonPretty => serde_json::to_string_pretty(report).unwrap_or_default(),
            OutputFormat::Csv => self.format_csv(report),
            OutputFormat::Summary => self.format_brief(report),
        }
    }

    fn format_case(&self, case: &CaseResult) -> String {
        let status = match (case.analysis.success, self.colorize) {
            (true, true) => "\x1b[32m✓ OK  \x1b[0m",
            (false, true) => "\x1b[31m✗ FAIL\x1b[0m",
            (true, false) => "✓ OK  ",
            (false, false) => "✗ FAIL",
        };

        format!(
            "{:32} {} [{:>9.2}ms] {:>5} pts",
            truncate(&case.label, 32),
            status,
            case.duration_ms,
            case.analysis.data_points
        )
    }

    fn format_api(&self, summary: &ApiSummary) -> String {
        let mut output = String::new();
        let d = &summary.durations;

        output.push_str(&format!("\n{}\n", summary.operation.title()));
        output.push_str(&format!("{}\n", "─".repeat(64)));
        for case in &summary.cases {
            output.push_str(&format!("  {}\n", self.format_case(case)));
            if let Some(message) = &case.analysis.error_message {
                output.push_str(&format!("      {}\n", truncate(message, 56)));
            }
        }
        output.push_str(&format!(
            "  Success: {}/{} ({:.1}%)  mean {:.2}ms  median {:.2}ms  min {:.2}ms  max {:.2}ms\n",
            summary.successes,
            summary.total,
            summary.success_rate,
            d.mean_ms,
            d.median_ms,
            d.min_ms,
            d.max_ms
        ));

        if summary.errors.total() > 0 {
            let e = &summary.errors;
            output.push_str(&format!(
                "  Errors: connection {} timeout {} 4xx {} 5xx {} other {}\n",
                e.connection_errors, e.timeout_errors, e.client_errors, e.server_errors, e.other_errors
            ));
        }

        output
    }

    fn format_table(&self, report: &SuiteReport) -> String {
        let mut output = String::new();
        let o = &report.overall;

        output.push_str("\n╔══════════════════════════════════════════════════════════════╗\n");
        output.push_str("║                 Geospatial API Benchmark Suite               ║\n");
        output.push_str("╚══════════════════════════════════════════════════════════════╝\n");

        for summary in &report.apis {
            output.push_str(&self.format_api(summary));
        }

        output.push_str(&format!("\n{}\n", "═".repeat(64)));
        output.push_str(&format!(
            "Total time:        {:.2}s\n",
            report.total_time_ms / 1000.0
        ));
        output.push_str(&format!(
            "Overall success:   {}/{} ({:.1}%)\n",
            o.successes, o.total_calls, o.overall_success_rate
        ));
        output.push_str(&format!(
            "Avg API success:   {:.1}%\n",
            o.avg_api_success_rate
        ));
        output.push_str(&format!(
            "Response time:     mean {:.2}ms  median {:.2}ms\n",
            o.durations.mean_ms, o.durations.median_ms
        ));

        output
    }

    fn format_csv(&self, report: &SuiteReport) -> String {
        let mut output =
            String::from("operation,label,success,duration_ms,data_points,error_kind,error\n");

        for summary in &report.apis {
            for case in &summary.cases {
                output.push_str(&format!(
                    "{},\"{}\",{},{:.2},{},{},\"{}\"\n",
                    summary.operation.name(),
                    case.label.replace('"', "\"\""),
                    case.analysis.success,
                    case.duration_ms,
                    case.analysis.data_points,
                    case.error_kind.as_deref().unwrap_or(""),
                    case.analysis
                        .error_message
                        .as_deref()
                        .unwrap_or("")
                        .replace('"', "\"\"")
                ));
            }
        }

        output
    }

    fn format_brief(&self, report: &SuiteReport) -> String {
        let parts: Vec<String> = report
            .apis
            .iter()
            .map(|s| format!("{} {:.0}%", s.operation.name(), s.success_rate))
            .collect();

        format!(
            "{}/{} calls succeeded in {:.2}s ({})",
            report.overall.successes,
            report.overall.total_calls,
            report.total_time_ms / 1000.0,
            parts.join(", ")
        )
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{head}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::benchmark::{DurationStats, ErrorStats, OverallStats, ResponseAnalysis};
    use crate::models::Operation;
    use chrono::Utc;
    use serde_json::json;

    fn report() -> SuiteReport {
        let cases = vec![
            CaseResult {
                label: "Delhi".into(),
                duration_ms: 120.0,
                analysis: ResponseAnalysis::from_payload(&json!({"h": 1})),
                error_kind: None,
            },
            CaseResult {
                label: "Mumbai, \"MH\"".into(),
                duration_ms: 30000.0,
                analysis: ResponseAnalysis::failure("request timed out"),
                error_kind: Some("timeout".into()),
            },
        ];
        let api = ApiSummary {
            operation: Operation::Geoid,
            total: 2,
            successes: 1,
            success_rate: 50.0,
            durations: DurationStats::from_samples(&[120.0, 30000.0]),
            errors: ErrorStats {
                timeout_errors: 1,
                ..Default::default()
            },
            cases,
        };

        SuiteReport {
            started_at: Utc::now(),
            completed_at: Utc::now(),
            total_time_ms: 30120.0,
            overall: OverallStats {
                total_calls: 2,
                successes: 1,
                overall_success_rate: 50.0,
                avg_api_success_rate: 50.0,
                durations: api.durations.clone(),
            },
            apis: vec![api],
        }
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!(OutputFormat::from_str("table"), Some(OutputFormat::Table));
        assert_eq!(
            OutputFormat::from_str("json-pretty"),
            Some(OutputFormat::JsonPretty)
        );
        assert_eq!(OutputFormat::from_str("nope"), None);
    }

    #[test]
    fn test_table_output() {
        let out = ResultFormatter::new(OutputFormat::Table)
            .no_color()
            .format_report(&report());
        assert!(out.contains("Geoid"));
        assert!(out.contains("✗ FAIL"));
        assert!(out.contains("Success: 1/2 (50.0%)"));
        assert!(out.contains("timeout 1"));
    }

    #[test]
    fn test_csv_output_escapes_quotes() {
        let out = ResultFormatter::new(OutputFormat::Csv).format_report(&report());
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[2].starts_with("geoid,\"Mumbai, \"\"MH\"\"\",false,30000.00,0,timeout,"));
    }

    #[test]
    fn test_summary_output() {
        let out = ResultFormatter::new(OutputFormat::Summary).format_report(&report());
        assert_eq!(out, "1/2 calls succeeded in 30.12s (geoid 50%)");
    }
}
