//! # tenure CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tenure_cli::config::{run_config, ConfigArgs};
use tenure_cli::replay::{run_replay, ReplayArgs};

/// Student-product lifecycle engine CLI.
///
/// Replays order scenarios against an in-memory store and inspects the
/// engine configuration.
#[derive(Parser, Debug)]
#[command(name = "tenure", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to the engine configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a scenario file and print the resulting chains as JSON.
    Replay(ReplayArgs),

    /// Print the effective engine configuration.
    Config(ConfigArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // RUST_LOG wins over the verbosity flag.
    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
    tenure_lifecycle::metrics::describe_metrics();

    tracing::debug!("tenure CLI starting");

    let config_path = cli.config.as_deref();
    let result = match cli.command {
        Commands::Replay(args) => run_replay(&args, config_path),
        Commands::Config(args) => run_config(&args, config_path),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tenure_cli::config::ConfigFormat;

    #[test]
    fn cli_parse_replay_basic() {
        let cli = Cli::try_parse_from(["tenure", "replay", "scenario.yaml"]).unwrap();
        assert_eq!(cli.verbose, 0);
        assert!(cli.config.is_none());
        if let Commands::Replay(args) = cli.command {
            assert_eq!(args.scenario, PathBuf::from("scenario.yaml"));
            assert!(args.resolve_on.is_none());
            assert!(!args.compact);
        } else {
            panic!("expected replay");
        }
    }

    #[test]
    fn cli_parse_replay_resolve_on_and_compact() {
        let cli = Cli::try_parse_from([
            "tenure",
            "replay",
            "scenario.yaml",
            "--resolve-on",
            "2024-09-01",
            "--compact",
        ])
        .unwrap();
        if let Commands::Replay(args) = cli.command {
            assert_eq!(
                args.resolve_on,
                chrono::NaiveDate::from_ymd_opt(2024, 9, 1)
            );
            assert!(args.compact);
        } else {
            panic!("expected replay");
        }
    }

    #[test]
    fn cli_parse_replay_rejects_bad_date() {
        let result = Cli::try_parse_from([
            "tenure",
            "replay",
            "scenario.yaml",
            "--resolve-on",
            "September",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn cli_parse_replay_requires_scenario() {
        assert!(Cli::try_parse_from(["tenure", "replay"]).is_err());
    }

    #[test]
    fn cli_parse_config_default_format() {
        let cli = Cli::try_parse_from(["tenure", "config"]).unwrap();
        if let Commands::Config(args) = cli.command {
            assert_eq!(args.format, ConfigFormat::Yaml);
        } else {
            panic!("expected config");
        }
    }

    #[test]
    fn cli_parse_config_json() {
        let cli = Cli::try_parse_from(["tenure", "config", "--format", "json"]).unwrap();
        if let Commands::Config(args) = cli.command {
            assert_eq!(args.format, ConfigFormat::Json);
        }
    }

    #[test]
    fn cli_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "tenure",
            "config",
            "-vv",
            "--config",
            "tenure.yaml",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.config, Some(PathBuf::from("tenure.yaml")));
    }

    #[test]
    fn cli_parse_unknown_subcommand_rejected() {
        assert!(Cli::try_parse_from(["tenure", "migrate"]).is_err());
    }
}
