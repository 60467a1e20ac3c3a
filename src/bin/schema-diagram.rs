//! schema-diagram CLI - import schemas into diagrams and diff diagram snapshots

use anyhow::Context;
use clap::{Parser, Subcommand};
use schema_diagram_sdk::cli::commands::{classify, diff, import};
use schema_diagram_sdk::cli::CliError;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::Level;

#[derive(Parser)]
#[command(name = "schema-diagram")]
#[command(about = "Import SQL DDL, DBML or introspection JSON into a diagram, and diff diagrams")]
#[command(version)]
struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect whether the input is DDL, DBML or introspection JSON
    Classify {
        /// Input file, or - for stdin
        input: String,
    },

    /// Import a schema and print the resulting diagram
    Import {
        /// Input file, or - for stdin
        input: String,

        /// Database engine (postgresql, mysql, sqlserver, sqlite, ...)
        #[arg(short, long)]
        engine: Option<String>,

        /// Output format: json or summary
        #[arg(short, long, default_value = "json")]
        format: String,

        /// TOML file with import settings
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Compare two diagram snapshots (JSON) and print the changes
    Diff {
        /// Snapshot before the change
        before: String,

        /// Snapshot after the change
        after: String,

        /// Print one line per change instead of JSON
        #[arg(long)]
        text: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            let code = e.downcast_ref::<CliError>().map(CliError::exit_code).unwrap_or(1);
            ExitCode::from(code)
        }
    }
}

fn run(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Classify { input } => {
            classify::handle_classify(&input).with_context(|| format!("Classifying {}", input))
        }
        Commands::Import {
            input,
            engine,
            format,
            config,
        } => {
            let format = format.parse::<import::OutputFormat>()?;
            import::handle_import(&input, engine.as_deref(), format, config.as_deref())
                .with_context(|| format!("Importing {}", input))
        }
        Commands::Diff { before, after, text } => {
            diff::handle_diff(&before, &after, text).with_context(|| format!("Comparing {} with {}", before, after))
        }
    }
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
