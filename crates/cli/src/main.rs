//! nl2sql CLI - answer natural-language questions with SQL
//!
//! Usage:
//!   nl2sql solve --database company.db --question "Average salary per department?"
//!   nl2sql schema --database company.db --format json
//!   nl2sql exec --database company.db --sql "SELECT COUNT(*) FROM employees"
//!   nl2sql extract --input response.txt

mod commands;
mod error;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::exec::{ExecArgs, handle_exec};
use commands::extract::{ExtractArgs, handle_extract};
use commands::schema::{SchemaArgs, handle_schema};
use commands::solve::{SolveArgs, handle_solve};
use error::CliError;
use output::OutputFormat;

#[derive(Parser)]
#[command(name = "nl2sql")]
#[command(about = "Answer natural-language questions with SQL against SQLite databases")]
#[command(version)]
struct Cli {
    /// Log prompts and raw oracle responses
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate, execute and refine SQL for a question
    Solve {
        /// Path to the SQLite database file
        #[arg(short, long)]
        database: PathBuf,

        /// The question to answer
        #[arg(short, long)]
        question: String,

        /// Schema document (JSON or YAML); introspected when omitted
        #[arg(short, long)]
        schema: Option<PathBuf>,

        /// Solver configuration file (YAML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Oracle model identifier
        #[arg(short, long)]
        model: Option<String>,

        /// Maximum refinement calls after the initial generation
        #[arg(long)]
        max_iterations: Option<usize>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Output file (stdout if not provided)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the schema of a SQLite database
    Schema {
        /// Path to the SQLite database file
        #[arg(short, long)]
        database: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Output file (stdout if not provided)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Execute one SQL statement
    Exec {
        /// Path to the SQLite database file
        #[arg(short, long)]
        database: PathBuf,

        /// Statement to execute
        #[arg(short, long)]
        sql: String,

        /// Open the database read-only
        #[arg(long)]
        read_only: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Extract the SQL statement from an oracle response
    Extract {
        /// Response file (stdin if not provided)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
}

fn init_tracing(verbose: bool) -> anyhow::Result<()> {
    let filter = if verbose {
        EnvFilter::try_new("info,nl2sql=debug,nl2sql_core=debug")?
    } else {
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Solve {
            database,
            question,
            schema,
            config,
            model,
            max_iterations,
            format,
            output,
        } => {
            handle_solve(&SolveArgs {
                database,
                question,
                schema,
                config,
                model,
                max_iterations,
                verbose: cli.verbose,
                format,
                output,
            })
            .await?
        }
        Commands::Schema {
            database,
            format,
            output,
        } => handle_schema(&SchemaArgs {
            database,
            format,
            output,
        })?,
        Commands::Exec {
            database,
            sql,
            read_only,
            format,
        } => handle_exec(&ExecArgs {
            database,
            sql,
            read_only,
            format,
        })?,
        Commands::Extract { input } => handle_extract(&ExtractArgs { input })?,
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.verbose) {
        eprintln!("Warning: logging disabled: {e}");
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<CliError>() {
                Some(cli_error) => eprintln!("Error: {}", cli_error.user_message()),
                None => eprintln!("Error: {e:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_solve_defaults() {
        let cli = Cli::try_parse_from([
            "nl2sql",
            "solve",
            "--database",
            "company.db",
            "--question",
            "How many employees?",
        ])
        .unwrap();
        assert!(!cli.verbose);
        match cli.command {
            Commands::Solve {
                format,
                max_iterations,
                schema,
                ..
            } => {
                assert_eq!(format, OutputFormat::Text);
                assert_eq!(max_iterations, None);
                assert!(schema.is_none());
            }
            _ => panic!("Expected solve"),
        }
    }

    #[test]
    fn test_parse_global_verbose_after_subcommand() {
        let cli = Cli::try_parse_from([
            "nl2sql", "exec", "-d", "x.db", "--sql", "SELECT 1", "-f", "json", "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert!(matches!(
            cli.command,
            Commands::Exec {
                format: OutputFormat::Json,
                ..
            }
        ));
    }

    #[test]
    fn test_parse_rejects_unknown_format() {
        let result = Cli::try_parse_from(["nl2sql", "schema", "-d", "x.db", "-f", "csv"]);
        assert!(result.is_err());
    }
}
