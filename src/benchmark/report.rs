//! Benchmark report generation
//!
//! Reads the call log, aggregates it per operation and renders the result
//! in one of several formats. HTML reports reference a bar chart of mean
//! durations written next to them as an SVG file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use super::metrics::{aggregate, AggregateStats};
use super::recorder::CallLog;

/// File name of the chart referenced by HTML reports
pub const CHART_FILE: &str = "benchmark_chart.svg";

const REPORT_STEM: &str = "benchmark_report";
const BAR_WIDTH: usize = 40;

/// Report output format
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    /// Plain text table with bars
    Text,
    /// JSON format
    Json,
    /// Pretty-printed JSON
    JsonPretty,
    /// Markdown format
    Markdown,
    /// CSV format
    Csv,
    /// HTML page plus SVG chart
    Html,
}

impl ReportFormat {
    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "table" | "txt" => Some(Self::Text),
            "json" => Some(Self::Json),
            "json-pretty" => Some(Self::JsonPretty),
            "markdown" | "md" => Some(Self::Markdown),
            "csv" => Some(Self::Csv),
            "html" => Some(Self::Html),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Text => "txt",
            Self::Json | Self::JsonPretty => "json",
            Self::Markdown => "md",
            Self::Csv => "csv",
            Self::Html => "html",
        }
    }
}

/// Result of a report run
#[derive(Clone, Debug, PartialEq)]
pub enum ReportOutcome {
    /// The log was missing or held no records
    NoData,
    Generated {
        /// Files written, report first
        files: Vec<PathBuf>,
        stats: Vec<AggregateStats>,
    },
}

/// Benchmark report generator
pub struct BenchmarkReport;

impl BenchmarkReport {
    /// Aggregate the log at `log_path` and write a report into `out_dir`
    pub fn generate(log_path: &Path, out_dir: &Path, format: ReportFormat) -> Result<ReportOutcome> {
        let records = CallLog::new(log_path)
            .read_all()
            .with_context(|| format!("Failed to read call log {}", log_path.display()))?;

        if records.is_empty() {
            info!("No benchmark data in {}", log_path.display());
            return Ok(ReportOutcome::NoData);
        }

        let stats = aggregate(&records);
        fs::create_dir_all(out_dir)
            .with_context(|| format!("Failed to create report directory {}", out_dir.display()))?;

        let mut files = Vec::new();
        let report_path = out_dir.join(format!("{REPORT_STEM}.{}", format.extension()));
        fs::write(&report_path, Self::render(&stats, format)?)
            .with_context(|| format!("Failed to write {}", report_path.display()))?;
        files.push(report_path);

        if format == ReportFormat::Html {
            let chart_path = out_dir.join(CHART_FILE);
            fs::write(&chart_path, Self::bar_chart_svg(&stats))
                .with_context(|| format!("Failed to write {}", chart_path.display()))?;
            files.push(chart_path);
        }

        info!(
            "Report over {} records ({} operations) written to {}",
            records.len(),
            stats.len(),
            out_dir.display()
        );
        Ok(ReportOutcome::Generated { files, stats })
    }

    /// Render aggregated statistics
    pub fn render(stats: &[AggregateStats], format: ReportFormat) -> Result<String> {
        Ok(match format {
            ReportFormat::Text => Self::text(stats),
            ReportFormat::Json => serde_json::to_string(stats)?,
            ReportFormat::JsonPretty => serde_json::to_string_pretty(stats)?,
            ReportFormat::Markdown => Self::markdown(stats),
            ReportFormat::Csv => Self::csv(stats)?,
            ReportFormat::Html => Self::html(stats),
        })
    }

    fn text(stats: &[AggregateStats]) -> String {
        let mut output = String::new();
        let widest = max_mean(stats);

        output.push_str(&format!("\n{:=^96}\n", " API Benchmark Report "));
        output.push_str(&format!(
            "{:<24} {:>6} {:>6} {:>10} {:>10} {:>10} {:>10} {:>10}\n",
            "Operation", "Calls", "Fail", "Mean", "Median", "Min", "Max", "P95"
        ));
        output.push_str(&format!("{}\n", "-".repeat(96)));

        for s in stats {
            let d = &s.durations;
            output.push_str(&format!(
                "{:<24} {:>6} {:>6} {:>10.2} {:>10.2} {:>10.2} {:>10.2} {:>10.2}\n",
                truncate(&s.operation, 24),
                s.count(),
                s.failures,
                d.mean_ms,
                d.median_ms,
                d.min_ms,
                d.max_ms,
                d.p95_ms
            ));
        }

        output.push_str("\nMean duration (ms):\n");
        for s in stats {
            let len = bar_len(s.durations.mean_ms, widest, BAR_WIDTH);
            output.push_str(&format!(
                "  {:<24} {:<width$} {:.2}\n",
                truncate(&s.operation, 24),
                "#".repeat(len),
                s.durations.mean_ms,
                width = BAR_WIDTH
            ));
        }

        output.push_str(&format!("{:=^96}\n", ""));
        output
    }

    fn markdown(stats: &[AggregateStats]) -> String {
        let mut output = String::new();

        output.push_str("# API Benchmark Report\n\n");
        output.push_str(
            "| Operation | Calls | Failures | Success | Mean (ms) | Median (ms) | Min (ms) | Max (ms) | P95 (ms) | Std Dev |\n",
        );
        output.push_str(
            "|-----------|-------|----------|---------|-----------|-------------|----------|----------|----------|---------|\n",
        );

        for s in stats {
            let d = &s.durations;
            output.push_str(&format!(
                "| {} | {} | {} | {:.1}% | {:.2} | {:.2} | {:.2} | {:.2} | {:.2} | {:.2} |\n",
                s.operation,
                s.count(),
                s.failures,
                s.success_rate() * 100.0,
                d.mean_ms,
                d.median_ms,
                d.min_ms,
                d.max_ms,
                d.p95_ms,
                d.std_dev_ms
            ));
        }

        output
    }

    fn csv(stats: &[AggregateStats]) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());

        writer.write_record([
            "operation",
            "count",
            "failures",
            "mean_ms",
            "median_ms",
            "min_ms",
            "max_ms",
            "p95_ms",
            "std_dev_ms",
        ])?;

        for s in stats {
            let d = &s.durations;
            writer.write_record([
                s.operation.clone(),
                s.count().to_string(),
                s.failures.to_string(),
                format!("{:.2}", d.mean_ms),
                format!("{:.2}", d.median_ms),
                format!("{:.2}", d.min_ms),
                format!("{:.2}", d.max_ms),
                format!("{:.2}", d.p95_ms),
                format!("{:.2}", d.std_dev_ms),
            ])?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("Failed to flush CSV report: {}", e.error()))?;
        Ok(String::from_utf8(bytes)?)
    }

    fn html(stats: &[AggregateStats]) -> String {
        let mut rows = String::new();
        for s in stats {
            let d = &s.durations;
            let class = if s.failures == 0 { "" } else { "danger" };
            rows.push_str(&format!(
                r#"<tr>
                    <td><strong>{}</strong></td>
                    <td>{}</td>
                    <td class="{}">{}</td>
                    <td>{:.2}</td>
                    <td>{:.2}</td>
                    <td>{:.2}</td>
                    <td>{:.2}</td>
                    <td>{:.2}</td>
                </tr>"#,
                escape(&s.operation),
                s.count(),
                class,
                s.failures,
                d.mean_ms,
                d.median_ms,
                d.min_ms,
                d.max_ms,
                d.p95_ms
            ));
        }

        format!(
            r#"<!DOCTYPE html>
<html>
<head>
    <title>API Benchmark Report</title>
    <style>
        body {{ font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; margin: 40px; background: #f5f5f5; }}
        .container {{ max-width: 1000px; margin: 0 auto; background: white; padding: 30px; border-radius: 8px; box-shadow: 0 2px 4px rgba(0,0,0,0.1); }}
        h1 {{ color: #333; border-bottom: 2px solid #007bff; padding-bottom: 10px; }}
        table {{ width: 100%; border-collapse: collapse; margin: 20px 0; }}
        th, td {{ padding: 12px; text-align: right; border-bottom: 1px solid #ddd; }}
        th {{ background: #007bff; color: white; font-weight: 600; }}
        td:first-child, th:first-child {{ text-align: left; }}
        .danger {{ color: #dc3545; font-weight: bold; }}
        img {{ max-width: 100%; }}
    </style>
</head>
<body>
    <div class="container">
        <h1>API Benchmark Report</h1>
        <table>
            <tr>
                <th>Operation</th>
                <th>Calls</th>
                <th>Failures</th>
                <th>Mean (ms)</th>
                <th>Median (ms)</th>
                <th>Min (ms)</th>
                <th>Max (ms)</th>
                <th>P95 (ms)</th>
            </tr>
            {rows}
        </table>
        <h2>Mean Duration</h2>
        <img src="{CHART_FILE}" alt="Mean duration per operation">
    </div>
</body>
</html>"#
        )
    }

    /// Horizontal bar chart of mean durations
    pub fn bar_chart_svg(stats: &[AggregateStats]) -> String {
        const LABEL_W: usize = 200;
        const PLOT_W: usize = 500;
        const ROW_H: usize = 36;
        const TOP: usize = 40;

        let widest = max_mean(stats);
        let height = TOP + ROW_H * stats.len() + 20;
        let width = LABEL_W + PLOT_W + 100;

        let mut bars = String::new();
        for (i, s) in stats.iter().enumerate() {
            let y = TOP + i * ROW_H;
            let len = bar_len(s.durations.mean_ms, widest, PLOT_W);
            bars.push_str(&format!(
                r##"  <text x="{}" y="{}" text-anchor="end" font-size="13">{}</text>
  <rect x="{}" y="{}" width="{}" height="{}" fill="#007bff"/>
  <text x="{}" y="{}" font-size="12">{:.2} ms</text>
"##,
                LABEL_W - 10,
                y + ROW_H / 2 + 4,
                escape(&s.operation),
                LABEL_W,
                y + 6,
                len,
                ROW_H - 12,
                LABEL_W + len + 6,
                y + ROW_H / 2 + 4,
                s.durations.mean_ms
            ));
        }

        format!(
            r##"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" font-family="sans-serif">
  <rect width="100%" height="100%" fill="white"/>
  <text x="{}" y="24" text-anchor="middle" font-size="16" font-weight="bold">Mean duration per operation</text>
{bars}</svg>
"##,
            width / 2
        )
    }
}

fn max_mean(stats: &[AggregateStats]) -> f64 {
    stats
        .iter()
        .map(|s| s.durations.mean_ms)
        .fold(0.0, f64::max)
}

fn bar_len(value: f64, max: f64, width: usize) -> usize {
    if max <= 0.0 {
        return 0;
    }
    ((value / max) * width as f64).round() as usize
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{head}...")
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
