use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use gridtest::commands::{batch, rollup};
use gridtest::logging;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "gridtest")]
#[command(about = "Run a source tree's test files in disposable sandboxes and report on them", long_about = None)]
#[command(version)]
#[command(subcommand_negates_reqs = true, args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    batch: BatchArgs,

    /// More log output (-v info, -vv debug, -vvv trace); GRIDTEST_LOG wins
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

/// Batch mode: run every test file below the start directory
#[derive(Args)]
struct BatchArgs {
    /// Location the sandboxes are created in
    #[arg(long, required = true)]
    location: Option<String>,

    /// Kind of location, used to select applicable tests
    #[arg(long, default_value = "nc")]
    location_type: String,

    /// Database root holding the location (default: the active session's)
    #[arg(long)]
    grassdata: Option<PathBuf>,

    /// Results directory
    #[arg(long, default_value = "testreport")]
    output: PathBuf,

    /// Percentage of test files that must succeed for exit status 0
    #[arg(long, default_value = "100", value_parser = batch::parse_min_success)]
    min_success: f64,

    /// key=value configuration file (default: .gridtest.cfg in the start directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Glob of test files to skip, relative to the start directory (repeatable)
    #[arg(long)]
    exclude: Vec<String>,

    /// Directory searched for tests
    #[arg(long, default_value = ".")]
    start_dir: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Rebuild the testsuite pages from the summaries in a results directory
    Rollup {
        /// Results directory of a previous run
        results_dir: PathBuf,
    },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    logging::init(cli.verbose)?;

    match cli.command {
        Some(Commands::Rollup { results_dir }) => {
            rollup::execute(&results_dir)?;
            Ok(ExitCode::SUCCESS)
        }
        None => {
            let args = cli.batch;
            let options = batch::BatchOptions {
                location: args.location.context("--location is required")?,
                location_type: args.location_type,
                grassdata: args.grassdata,
                output: args.output,
                min_success: args.min_success,
                config: args.config,
                exclude: args.exclude,
                start_dir: args.start_dir,
            };
            let passed = batch::execute(options)?;
            Ok(if passed {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}
