//! geobench - benchmarked geospatial API client
//!
//! Queries thematic statistics, routing and geoid upstreams, times every
//! call into an append-only JSONL log and turns that log into reports.
//!
//! ## Features
//!
//! - Single benchmarked queries from the command line
//! - HTTP service forwarding requests to the upstreams with timing attached
//! - Batch suite over configured locations and routes
//! - Text, Markdown, CSV, JSON and HTML reports with an SVG bar chart
//! - Token validation and a parameter probe for new endpoints
//!
//! ## Usage
//!
//! ```bash
//! # Serve the HTTP API on the configured address
//! geobench serve --port 5001
//!
//! # One query
//! geobench query geoid --lat 12.9716 --lng 77.5946
//!
//! # Benchmark every operation
//! geobench suite --concurrent 8
//!
//! # Render the call log
//! geobench report --format html
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

mod api;
mod benchmark;
mod cli;
mod config;
mod http;
mod models;
mod output;
mod probe;
mod results;
mod server;
#[cfg(test)]
mod testutil;
mod utils;

use api::GeoClient;
use benchmark::{BenchmarkReport, Benchmarker, CallLog, ReportFormat, ReportOutcome, SuiteRunner};
use cli::Args;
use config::{AppConfig, EnvConfig, TokenReport};
use models::{Coordinates, Operation, Parameters};
use output::{OutputFormat, ResultFormatter};
use results::{ExportFormat, ResultsStorage, RunConfig, StoredRun};
use utils::{init_logger, time_sync, LogLevel};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let env = EnvConfig::load();

    let level = if args.verbose || env.verbose.unwrap_or(false) {
        LogLevel::Debug
    } else {
        env.log_level.unwrap_or(LogLevel::Info)
    };
    init_logger(level);

    // Resolved lazily so `config` subcommands still work on a broken file
    let resolve = || AppConfig::resolve(args.config.as_deref(), &env);

    match args.command {
        cli::Command::Serve(serve_args) => {
            serve(serve_args, resolve()?).await?;
        }
        cli::Command::Query(query_args) => {
            run_query(query_args, &resolve()?).await?;
        }
        cli::Command::Suite(suite_args) => {
            run_suite(suite_args, &resolve()?).await?;
        }
        cli::Command::Report(report_args) => {
            generate_report(report_args, &resolve()?)?;
        }
        cli::Command::Results(results_args) => {
            show_results(results_args, &resolve()?)?;
        }
        cli::Command::Tokens(tokens_args) => {
            check_tokens(tokens_args, &resolve()?)?;
        }
        cli::Command::Probe(probe_args) => {
            run_probe(probe_args, &resolve()?).await?;
        }
        cli::Command::Config(config_args) => {
            manage_config(config_args, args.config.as_deref(), &env)?;
        }
    }

    Ok(())
}

fn formatter(format: OutputFormat) -> ResultFormatter {
    let formatter = ResultFormatter::new(format);
    if std::io::stdout().is_terminal() {
        formatter
    } else {
        formatter.no_color()
    }
}

fn benchmarker(config: &AppConfig) -> Benchmarker {
    let log = CallLog::new(&config.log_path);
    info!("Call log: {}", log.path().display());
    Benchmarker::new(Arc::new(log))
}

async fn serve(args: cli::ServeArgs, mut config: AppConfig) -> Result<()> {
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let tokens = TokenReport::from_config(&config);
    tokens.log();
    let available: Vec<&str> = tokens.available().iter().map(|op| op.name()).collect();
    if !available.is_empty() {
        info!("Serving with tokens for: {}", available.join(", "));
    }
    if !tokens.valid() {
        warn!("Some services have no access token; their calls will likely be rejected upstream");
    }

    let client = GeoClient::from_config(&config).context("Failed to build upstream client")?;
    let state = server::AppState::new(client, benchmarker(&config));

    server::serve(&config.server.addr(), state).await
}

async fn run_query(args: cli::QueryArgs, config: &AppConfig) -> Result<()> {
    let operation = Operation::from_str(&args.operation)
        .ok_or_else(|| anyhow::anyhow!("Unknown operation: {}", args.operation))?;

    let origin = Coordinates::new(args.lat, args.lng);
    let parameters: Parameters = args.params.into_iter().collect();

    let client = GeoClient::from_config(config).context("Failed to build upstream client")?;
    let bench = benchmarker(config);

    let (result, duration_ms) = match operation {
        Operation::Routing => {
            let (Some(lat), Some(lng)) = (args.dest_lat, args.dest_lng) else {
                anyhow::bail!("Routing needs --dest-lat and --dest-lng");
            };
            let destination = Coordinates::new(lat, lng);
            let arguments = serde_json::json!({
                "origin": origin,
                "destination": destination,
                "parameters": &parameters,
            });
            bench
                .call(
                    operation.name(),
                    &arguments,
                    client.route(origin, destination, &parameters),
                )
                .await?
        }
        Operation::ThematicStatistics | Operation::Geoid => {
            let arguments = serde_json::json!({
                "coordinates": origin,
                "parameters": &parameters,
            });
            let call = client.point_query(operation, origin, &parameters);
            bench.call(operation.name(), &arguments, call).await?
        }
    };

    let output = if args.compact {
        serde_json::to_string(&result)?
    } else {
        serde_json::to_string_pretty(&result)?
    };
    println!("{output}");
    eprintln!("\n{} took {:.2}ms", operation.title(), duration_ms);

    Ok(())
}

async fn run_suite(args: cli::SuiteArgs, config: &AppConfig) -> Result<()> {
    let operations = args
        .operations
        .iter()
        .map(|name| {
            Operation::from_str(name).ok_or_else(|| anyhow::anyhow!("Unknown operation: {name}"))
        })
        .collect::<Result<Vec<_>>>()?;

    let format = OutputFormat::from_str(&args.format)
        .ok_or_else(|| anyhow::anyhow!("Unknown output format: {}", args.format))?;
    let max_concurrent = args.concurrent.unwrap_or(config.max_concurrent);

    let client = GeoClient::from_config(config).context("Failed to build upstream client")?;
    let runner = SuiteRunner::new(Arc::new(client), benchmarker(config), config.suite.clone())
        .with_concurrency(max_concurrent);

    info!(
        "Running suite over {} locations and {} routes ({} concurrent)",
        config.suite.locations.len(),
        config.suite.routes.len(),
        max_concurrent
    );

    let report = runner.run(&operations).await;
    println!("{}", formatter(format).format_report(&report));

    if !args.no_save {
        let storage = ResultsStorage::new(&config.results_dir);
        let run = StoredRun::new(
            report,
            RunConfig {
                timeout_secs: config.timeout_secs,
                max_concurrent,
            },
        );
        let path = storage.save(&run)?;
        println!("\n✓ Saved run {} to {}", run.id, path.display());
    }

    Ok(())
}

fn generate_report(args: cli::ReportArgs, config: &AppConfig) -> Result<()> {
    let format = ReportFormat::from_str(&args.format)
        .ok_or_else(|| anyhow::anyhow!("Unknown report format: {}", args.format))?;
    let log_path = args.log.unwrap_or_else(|| config.log_path.clone());
    let out_dir = args.output.unwrap_or_else(|| config.report_dir.clone());

    let timed = time_sync(|| BenchmarkReport::generate(&log_path, &out_dir, format));
    debug!("Report generation took {:.2}ms", timed.duration_ms);

    match timed.value? {
        ReportOutcome::NoData => {
            println!("No benchmark data found in {}", log_path.display());
        }
        ReportOutcome::Generated { files, stats } => {
            println!("✓ Report over {} operations:", stats.len());
            for file in &files {
                println!("  {}", file.display());
            }
            if args.print {
                println!("\n{}", BenchmarkReport::render(&stats, format)?);
            }
        }
    }

    Ok(())
}

fn show_results(args: cli::ResultsArgs, config: &AppConfig) -> Result<()> {
    let storage = ResultsStorage::new(args.dir.unwrap_or_else(|| config.results_dir.clone()));

    match args.action.unwrap_or(cli::ResultsAction::List) {
        cli::ResultsAction::List => {
            let runs = storage.list_runs()?;
            if runs.is_empty() {
                println!("\n📭 No stored runs in {}", storage.base_dir().display());
                println!("   Run the suite with: geobench suite");
                return Ok(());
            }

            println!(
                "\n{:<22} {:<20} {:>7} {:>9} {:>12}",
                "RUN", "STARTED", "CALLS", "SUCCESS", "TOTAL"
            );
            println!("{:-<74}", "");
            for run in runs {
                println!(
                    "{:<22} {:<20} {:>7} {:>8.1}% {:>10.0}ms",
                    run.id,
                    run.started_at.format("%Y-%m-%d %H:%M:%S"),
                    run.total_calls,
                    run.success_rate,
                    run.total_time_ms
                );
            }
            println!();
        }

        cli::ResultsAction::Show { id, format } => {
            let format = OutputFormat::from_str(&format)
                .ok_or_else(|| anyhow::anyhow!("Unknown output format: {format}"))?;
            let run = match id {
                Some(id) => storage.load(&id)?,
                None => match storage.latest()? {
                    Some(run) => run,
                    None => {
                        println!("No stored runs in {}", storage.base_dir().display());
                        return Ok(());
                    }
                },
            };

            if format == OutputFormat::Table {
                println!(
                    "\nRun {} ({} {}, geobench {})",
                    run.id, run.environment.os, run.environment.arch, run.environment.tool_version
                );
            }
            println!("{}", formatter(format).format_report(&run.report));
        }

        cli::ResultsAction::Export { id, output } => {
            let format = ExportFormat::from_extension(&output).ok_or_else(|| {
                anyhow::anyhow!("Cannot infer export format from {}", output.display())
            })?;
            let run = storage.load(&id)?;
            storage.export(&run, &output, format)?;
            println!("✓ Exported run {} to {}", run.id, output.display());
        }

        cli::ResultsAction::Delete { id } => {
            storage.delete(&id)?;
            println!("✓ Deleted run {id}");
        }
    }

    Ok(())
}

fn check_tokens(args: cli::TokensArgs, config: &AppConfig) -> Result<()> {
    let report = TokenReport::from_config(config);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report.format_table());
    }

    if args.strict && !report.valid() {
        let missing: Vec<_> = report
            .missing_essential()
            .iter()
            .map(|op| op.name())
            .collect();
        anyhow::bail!("Missing access tokens: {}", missing.join(", "));
    }

    Ok(())
}

async fn run_probe(args: cli::ProbeArgs, config: &AppConfig) -> Result<()> {
    let plan = probe::ProbePlan::load(&args.plan)?;
    let http = http::HttpClient::build(config.timeout(), config.accept_invalid_certs)
        .context("Failed to build HTTP client")?;

    info!(
        "Probing {} with {} candidates ({}s timeout each)",
        plan.url,
        plan.candidates.len(),
        http.timeout().as_secs()
    );
    let outcome = probe::run(&plan, &http).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    println!("\n{:<24} {:>8} {:>12}  {}", "CANDIDATE", "STATUS", "TIME", "NOTE");
    println!("{:-<70}", "");
    for attempt in &outcome.attempts {
        let status = attempt
            .status
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string());
        let note = match (&attempt.error, attempt.empty) {
            (Some(error), _) => error.clone(),
            (None, true) => "empty body".to_string(),
            (None, false) => String::new(),
        };
        println!(
            "{:<24} {:>8} {:>10.2}ms  {}",
            attempt.label, status, attempt.duration_ms, note
        );
    }

    match &outcome.hit {
        Some(hit) => {
            println!("\n✓ {} answered HTTP {}", hit.label, hit.status);
            println!("{}", hit.body.to_text());
        }
        None => println!("\n✗ No candidate produced data"),
    }

    Ok(())
}

fn manage_config(
    args: cli::ConfigArgs,
    explicit: Option<&std::path::Path>,
    env: &EnvConfig,
) -> Result<()> {
    match args.action {
        cli::ConfigAction::Init { output, force } => {
            if output.exists() && !force {
                anyhow::bail!(
                    "Configuration file already exists: {}. Use --force to overwrite.",
                    output.display()
                );
            }

            AppConfig::example().save(&output)?;
            println!("✓ Configuration file created: {}", output.display());
            println!("\nEdit the file to set base URLs and tokens.");
        }

        cli::ConfigAction::Show { env: show_env, format } => {
            if show_env {
                env.print_summary();
            } else {
                let config = AppConfig::resolve(explicit, env)?.masked();
                let output = if format == "json" {
                    serde_json::to_string_pretty(&config)?
                } else {
                    serde_yaml::to_string(&config)?
                };
                println!("{output}");
            }
        }

        cli::ConfigAction::Validate { file } => {
            let path = file
                .or_else(|| explicit.map(PathBuf::from))
                .or_else(AppConfig::find)
                .unwrap_or_else(|| PathBuf::from("./geobench.yaml"));

            match AppConfig::load(&path) {
                Ok(_) => {
                    println!("✓ Configuration file is valid: {}", path.display());
                }
                Err(e) => {
                    println!("✗ Configuration file is invalid: {}", path.display());
                    println!("  Error: {e:#}");
                    return Err(e);
                }
            }
        }

        cli::ConfigAction::Env => {
            config::print_env_help();
        }
    }

    Ok(())
}
