//! Results storage and retrieval
//!
//! Provides persistent storage for suite runs in JSON format.

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::benchmark::SuiteReport;

/// Stored suite run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredRun {
    /// Unique run ID
    pub id: String,

    /// Run configuration
    pub config: RunConfig,

    /// Environment info
    pub environment: EnvironmentInfo,

    #[serde(flatten)]
    pub report: SuiteReport,
}

/// Settings a run was made with
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub timeout_secs: u64,
    pub max_concurrent: usize,
}

/// Environment information
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentInfo {
    /// Operating system
    pub os: String,

    /// Architecture
    pub arch: String,

    /// Tool version
    pub tool_version: String,
}

impl Default for EnvironmentInfo {
    fn default() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl StoredRun {
    pub fn new(report: SuiteReport, config: RunConfig) -> Self {
        Self {
            id: generate_run_id(),
            config,
            environment: EnvironmentInfo::default(),
            report,
        }
    }
}

/// Generate unique run ID
fn generate_run_id() -> String {
    let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
    let random: u32 = rand::random::<u32>() % 10000;
    format!("{timestamp}_{random:04}")
}

/// Brief run information
#[derive(Clone, Debug)]
pub struct RunInfo {
    pub id: String,
    pub started_at: chrono::DateTime<Utc>,
    pub total_calls: usize,
    pub success_rate: f64,
    pub total_time_ms: f64,
}

/// Results storage manager
pub struct ResultsStorage {
    /// Base directory for results
    base_dir: PathBuf,
}

impl ResultsStorage {
    /// Create a new results storage
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn run_path(&self, run_id: &str) -> PathBuf {
        self.base_dir.join(format!("{run_id}.json"))
    }

    /// Save a suite run
    pub fn save(&self, run: &StoredRun) -> Result<PathBuf> {
        fs::create_dir_all(&self.base_dir).with_context(|| {
            format!("Failed to create results directory {}", self.base_dir.display())
        })?;

        let path = self.run_path(&run.id);
        let file = File::create(&path).context("Failed to create results file")?;
        let writer = BufWriter::new(file);

        serde_json::to_writer_pretty(writer, run).context("Failed to write results")?;

        info!("Saved suite results to {}", path.display());
        Ok(path)
    }

    /// Load a suite run
    pub fn load(&self, run_id: &str) -> Result<StoredRun> {
        let path = self.run_path(run_id);
        let run = Self::load_from_path(&path)?;
        debug!("Loaded suite results from {}", path.display());
        Ok(run)
    }

    /// Load from a specific path
    pub fn load_from_path(path: &Path) -> Result<StoredRun> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open results file {}", path.display()))?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader).context("Failed to parse results")
    }

    /// Load every stored run, newest first
    pub fn load_all(&self) -> Result<Vec<StoredRun>> {
        if !self.base_dir.exists() {
            return Ok(Vec::new());
        }

        let mut runs = Vec::new();
        for entry in fs::read_dir(&self.base_dir)? {
            let path = entry?.path();

            if path.extension().map(|e| e == "json").unwrap_or(false) {
                match Self::load_from_path(&path) {
                    Ok(run) => runs.push(run),
                    Err(e) => debug!("Failed to load {}: {}", path.display(), e),
                }
            }
        }

        runs.sort_by(|a, b| b.report.started_at.cmp(&a.report.started_at));
        Ok(runs)
    }

    /// List stored runs, newest first
    pub fn list_runs(&self) -> Result<Vec<RunInfo>> {
        Ok(self
            .load_all()?
            .into_iter()
            .map(|run| RunInfo {
                id: run.id,
                started_at: run.report.started_at,
                total_calls: run.report.overall.total_calls,
                success_rate: run.report.overall.overall_success_rate,
                total_time_ms: run.report.total_time_ms,
            })
            .collect())
    }

    /// Most recent run
    pub fn latest(&self) -> Result<Option<StoredRun>> {
        Ok(self.load_all()?.into_iter().next())
    }

    /// Delete a run
    pub fn delete(&self, run_id: &str) -> Result<()> {
        let path = self.run_path(run_id);
        if path.exists() {
            fs::remove_file(&path)?;
            info!("Deleted results: {}", path.display());
        }
        Ok(())
    }

    /// Export run to a file
    pub fn export(&self, run: &StoredRun, path: &Path, format: ExportFormat) -> Result<()> {
        match format {
            ExportFormat::Json => {
                let file = File::create(path)?;
                let writer = BufWriter::new(file);
                serde_json::to_writer_pretty(writer, run)?;
            }
            ExportFormat::Csv => {
                let mut writer = csv::Writer::from_path(path)?;

                writer.write_record([
                    "run_id",
                    "operation",
                    "label",
                    "success",
                    "duration_ms",
                    "data_points",
                    "error_kind",
                    "error",
                ])?;

                for summary in &run.report.apis {
                    for case in &summary.cases {
                        writer.write_record([
                            run.id.clone(),
                            summary.operation.name().to_string(),
                            case.label.clone(),
                            case.analysis.success.to_string(),
                            format!("{:.2}", case.duration_ms),
                            case.analysis.data_points.to_string(),
                            case.error_kind.clone().unwrap_or_default(),
                            case.analysis.error_message.clone().unwrap_or_default(),
                        ])?;
                    }
                }
                writer.flush()?;
            }
        }

        info!("Exported results to {}", path.display());
        Ok(())
    }
}

/// Export format
#[derive(Clone, Copy, Debug)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(ExportFormat::Json),
            "csv" => Some(ExportFormat::Csv),
            _ => None,
        }
    }

    pub fn from_extension(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_str)
    }
}
