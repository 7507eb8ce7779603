//! CLI argument parsing
//!
//! Defines command-line interface using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::models::{parse_param, ParamValue};

/// Benchmarked geospatial API client
#[derive(Parser, Debug)]
#[command(name = "geobench")]
#[command(version)]
#[command(about = "Query, benchmark and serve geospatial upstream APIs")]
#[command(long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (YAML or JSON)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP service
    Serve(ServeArgs),

    /// Run one benchmarked upstream query
    Query(QueryArgs),

    /// Benchmark every operation over the configured test cases
    Suite(SuiteArgs),

    /// Render a report from the call log
    Report(ReportArgs),

    /// View stored suite runs
    Results(ResultsArgs),

    /// Check which services have tokens configured
    Tokens(TokensArgs),

    /// Try candidate parameter sets against an endpoint
    Probe(ProbeArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

/// Arguments for serve command
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Bind host
    #[arg(long)]
    pub host: Option<String>,

    /// Bind port
    #[arg(short, long)]
    pub port: Option<u16>,
}

/// Arguments for query command
#[derive(Parser, Debug)]
pub struct QueryArgs {
    /// Operation (thematic, routing, geoid)
    pub operation: String,

    /// Latitude (origin for routing)
    #[arg(long, allow_hyphen_values = true)]
    pub lat: f64,

    /// Longitude (origin for routing)
    #[arg(long, allow_hyphen_values = true)]
    pub lng: f64,

    /// Destination latitude (routing only)
    #[arg(long, allow_hyphen_values = true)]
    pub dest_lat: Option<f64>,

    /// Destination longitude (routing only)
    #[arg(long, allow_hyphen_values = true)]
    pub dest_lng: Option<f64>,

    /// Extra upstream parameter (key=value, repeatable)
    #[arg(short, long = "param", value_parser = parse_param)]
    pub params: Vec<(String, ParamValue)>,

    /// Print compact JSON
    #[arg(long)]
    pub compact: bool,
}

/// Arguments for suite command
#[derive(Parser, Debug)]
pub struct SuiteArgs {
    /// Operations to run (comma-separated, default all)
    #[arg(short, long, value_delimiter = ',')]
    pub operations: Vec<String>,

    /// Number of concurrent calls
    #[arg(short, long)]
    pub concurrent: Option<usize>,

    /// Output format (table, json, json-pretty, csv, summary)
    #[arg(short, long, default_value = "table")]
    pub format: String,

    /// Do not store the run
    #[arg(long)]
    pub no_save: bool,
}

/// Arguments for report command
#[derive(Parser, Debug)]
pub struct ReportArgs {
    /// Call log to read (default from configuration)
    #[arg(short, long)]
    pub log: Option<PathBuf>,

    /// Output directory (default from configuration)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Report format (html, text, markdown, json, json-pretty, csv)
    #[arg(short, long, default_value = "html")]
    pub format: String,

    /// Also print the report to stdout
    #[arg(long)]
    pub print: bool,
}

/// Arguments for results command
#[derive(Parser, Debug)]
pub struct ResultsArgs {
    #[command(subcommand)]
    pub action: Option<ResultsAction>,

    /// Results directory (default from configuration)
    #[arg(short, long, global = true)]
    pub dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum ResultsAction {
    /// List stored runs
    List,

    /// Show a run (latest when no id is given)
    Show {
        id: Option<String>,

        /// Output format (table, json, json-pretty, csv, summary)
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Export a run to JSON or CSV, chosen by extension
    Export {
        id: String,

        /// Output file
        output: PathBuf,
    },

    /// Delete a run
    Delete { id: String },
}

/// Arguments for tokens command
#[derive(Parser, Debug)]
pub struct TokensArgs {
    /// Exit with an error when an essential token is missing
    #[arg(long)]
    pub strict: bool,

    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

/// Arguments for probe command
#[derive(Parser, Debug)]
pub struct ProbeArgs {
    /// Probe plan file (YAML or JSON)
    pub plan: PathBuf,

    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

/// Arguments for config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Write an example configuration file
    Init {
        /// Output path
        #[arg(short, long, default_value = "geobench.yaml")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Show the effective configuration
    Show {
        /// Show environment variables instead
        #[arg(long)]
        env: bool,

        /// Output format (yaml, json)
        #[arg(short, long, default_value = "yaml")]
        format: String,
    },

    /// Validate a configuration file
    Validate {
        /// File to validate (default: search standard locations)
        file: Option<PathBuf>,
    },

    /// List supported environment variables
    Env,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_args() {
        let args = Args::parse_from([
            "geobench",
            "query",
            "routing",
            "--lat",
            "12.9716",
            "--lng",
            "77.5946",
            "--dest-lat",
            "-12.29",
            "--dest-lng",
            "76.63",
            "-p",
            "mode=car",
            "--param",
            "alternatives=3",
        ]);
        match args.command {
            Command::Query(q) => {
                assert_eq!(q.operation, "routing");
                assert_eq!(q.lat, 12.9716);
                assert_eq!(q.dest_lat, Some(-12.29));
                assert_eq!(q.params.len(), 2);
                assert_eq!(q.params[0].0, "mode");
                assert_eq!(q.params[0].1.to_string(), "car");
            }
            _ => panic!("Expected Query command"),
        }
    }

    #[test]
    fn test_invalid_param_rejected() {
        let result = Args::try_parse_from([
            "geobench", "query", "geoid", "--lat", "1", "--lng", "2", "-p", "novalue",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_suite_args() {
        let args = Args::parse_from([
            "geobench",
            "--verbose",
            "suite",
            "--operations",
            "geoid,routing",
            "-c",
            "8",
            "--no-save",
        ]);
        assert!(args.verbose);
        match args.command {
            Command::Suite(s) => {
                assert_eq!(s.operations, vec!["geoid", "routing"]);
                assert_eq!(s.concurrent, Some(8));
                assert!(s.no_save);
                assert_eq!(s.format, "table");
            }
            _ => panic!("Expected Suite command"),
        }
    }

    #[test]
    fn test_global_config_flag() {
        let args = Args::parse_from(["geobench", "serve", "--config", "prod.yaml", "-p", "8080"]);
        assert_eq!(args.config, Some(PathBuf::from("prod.yaml")));
        match args.command {
            Command::Serve(s) => assert_eq!(s.port, Some(8080)),
            _ => panic!("Expected Serve command"),
        }
    }

    #[test]
    fn test_results_and_config_actions() {
        let args = Args::parse_from(["geobench", "results", "show", "--format", "json"]);
        match args.command {
            Command::Results(r) => match r.action {
                Some(ResultsAction::Show { id, format }) => {
                    assert!(id.is_none());
                    assert_eq!(format, "json");
                }
                _ => panic!("Expected Show action"),
            },
            _ => panic!("Expected Results command"),
        }

        let args = Args::parse_from(["geobench", "config", "init", "--force"]);
        match args.command {
            Command::Config(c) => match c.action {
                ConfigAction::Init { output, force } => {
                    assert_eq!(output, PathBuf::from("geobench.yaml"));
                    assert!(force);
                }
                _ => panic!("Expected Init action"),
            },
            _ => panic!("Expected Config command"),
        }
    }

    #[test]
    fn test_report_defaults() {
        let args = Args::parse_from(["geobench", "report"]);
        match args.command {
            Command::Report(r) => {
                assert_eq!(r.format, "html");
                assert!(r.log.is_none());
                assert!(!r.print);
            }
            _ => panic!("Expected Report command"),
        }
    }
}
