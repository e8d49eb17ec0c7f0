//! runlens CLI entry point.
//!
//! Parses command-line arguments and dispatches to the appropriate command handler.

use clap::{Parser, Subcommand};
use runlens::commands::{
    columns_command, compare_command, config_display_command, config_reset_command,
    metrics_command, runs_command, sessions_command, RunsOptions,
};
use runlens::output::print_error;
use runlens::table::RunFacets;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "runlens")]
#[command(
    version,
    about = "Browse, aggregate and compare batches of evaluation runs",
    after_help = "EXAMPLES:
    # Which columns would the run listing show?
    runlens columns results.json --workflow checkout-bot

    # Best runs first, only those using a given model
    runlens runs results.json --workflow checkout-bot --sort avgScore --desc --model gpt-4o

    # Conversations of one run, most recent first
    runlens sessions results.json --run run-42

    # Two runs side by side
    runlens compare results.json --workflow checkout-bot run-41 run-42"
)]
struct Cli {
    /// Log engine decisions at debug level (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the columns discovered for a listing
    #[command(after_help = "EXAMPLES:
    runlens columns data.json                  # Workflow listing
    runlens columns data.json --workflow W     # Run listing of workflow W
    runlens columns data.json --run R          # Execution fields of run R")]
    Columns {
        /// Dataset JSON file
        file: PathBuf,

        /// Describe the run listing of this workflow
        #[arg(short, long)]
        workflow: Option<String>,

        /// Describe the execution fields of this run (takes precedence)
        #[arg(short, long)]
        run: Option<String>,
    },

    /// List the runs of a workflow with aggregated metrics
    Runs {
        /// Dataset JSON file
        file: PathBuf,

        #[arg(short, long)]
        workflow: String,

        /// Column to sort by (defaults to the configured sort key)
        #[arg(short, long)]
        sort: Option<String>,

        /// Sort descending
        #[arg(long)]
        desc: bool,

        /// Case-insensitive substring search over every field
        #[arg(short = 'q', long)]
        search: Option<String>,

        /// Only runs using this model
        #[arg(long)]
        model: Option<String>,

        /// Only runs using this prompt version
        #[arg(long)]
        prompt_version: Option<String>,

        /// Only runs with this run version
        #[arg(long)]
        run_version: Option<String>,
    },

    /// Group one run's executions into conversation sessions
    Sessions {
        /// Dataset JSON file
        file: PathBuf,

        #[arg(short, long)]
        run: String,
    },

    /// Show the aggregated metrics of one run
    Metrics {
        /// Dataset JSON file
        file: PathBuf,

        #[arg(short, long)]
        run: String,
    },

    /// Compare per-metric means of several runs of a workflow
    Compare {
        /// Dataset JSON file
        file: PathBuf,

        #[arg(short, long)]
        workflow: String,

        /// Run ids, in display order
        #[arg(required = true)]
        runs: Vec<String>,
    },

    /// Show or reset the configuration (~/.config/runlens/config.toml)
    Config {
        #[command(subcommand)]
        subcommand: Option<ConfigSubcommand>,
    },
}

#[derive(Subcommand)]
enum ConfigSubcommand {
    /// Overwrite the config file with the defaults
    Reset,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn,runlens=info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Columns { file, workflow, run } => {
            columns_command(&file, workflow.as_deref(), run.as_deref())
        }
        Commands::Runs {
            file,
            workflow,
            sort,
            desc,
            search,
            model,
            prompt_version,
            run_version,
        } => runs_command(
            &file,
            &RunsOptions {
                workflow,
                sort,
                descending: desc,
                search,
                facets: RunFacets {
                    model,
                    prompt_version,
                    version: run_version,
                },
            },
        ),
        Commands::Sessions { file, run } => sessions_command(&file, &run),
        Commands::Metrics { file, run } => metrics_command(&file, &run),
        Commands::Compare {
            file,
            workflow,
            runs,
        } => compare_command(&file, &workflow, &runs),
        Commands::Config { subcommand } => match subcommand {
            None => config_display_command(),
            Some(ConfigSubcommand::Reset) => config_reset_command(),
        },
    };

    if let Err(e) = result {
        print_error(&e.to_string());
        std::process::exit(1);
    }
}
