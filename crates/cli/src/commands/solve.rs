//! Solve command implementation

use std::path::PathBuf;

use nl2sql_core::{DatabaseTarget, RefinementLoop, SolverConfig};
use tracing::debug;

use super::schema::load_schema;
use crate::error::CliError;
use crate::output::{OutputFormat, format_trace, to_json, to_yaml, write_output};

/// Arguments for the `solve` command
pub struct SolveArgs {
    /// Path to the SQLite database file
    pub database: PathBuf,
    /// Natural-language question
    pub question: String,
    /// Schema document (introspected from the database if not provided)
    pub schema: Option<PathBuf>,
    /// Solver configuration file (YAML)
    pub config: Option<PathBuf>,
    /// Model identifier override
    pub model: Option<String>,
    /// Refinement budget override
    pub max_iterations: Option<usize>,
    /// Log prompts and raw oracle responses
    pub verbose: bool,
    /// Output format (text, json, yaml)
    pub format: OutputFormat,
    /// Output file path (stdout if not provided)
    pub output: Option<PathBuf>,
}

/// Build the solver configuration from the file and command-line overrides
pub fn load_config(args: &SolveArgs) -> Result<SolverConfig, CliError> {
    let mut config = match &args.config {
        Some(path) => SolverConfig::from_yaml_file(path)?,
        None => SolverConfig::default(),
    };

    if let Some(model) = &args.model {
        config = config.with_model(model.clone());
    }
    if let Some(max_iterations) = args.max_iterations {
        config.max_iterations = max_iterations;
    }
    if args.verbose {
        config.verbose = true;
    }
    config.oracle = config.oracle.with_env_credentials();

    config.validate()?;
    Ok(config)
}

/// Handle the `solve` command
pub async fn handle_solve(args: &SolveArgs) -> Result<(), CliError> {
    if args.question.trim().is_empty() {
        return Err(CliError::InvalidArgument("question must not be empty".into()));
    }

    let config = load_config(args)?;
    debug!(
        mode = ?config.oracle.mode,
        endpoint = config.oracle.endpoint(),
        model = %config.oracle.model,
        max_iterations = config.max_iterations,
        "Loaded configuration"
    );
    let schema = load_schema(&args.database, args.schema.as_deref())?;
    let solver = RefinementLoop::from_config(config)?;
    let target = DatabaseTarget::new(args.database.clone());

    let (_, trace) = solver.solve(&args.question, &schema, &target).await?;

    let content = match args.format {
        OutputFormat::Text => format_trace(&trace),
        OutputFormat::Json => to_json(&trace.to_report())?,
        OutputFormat::Yaml => to_yaml(&trace.to_report())?,
    };
    write_output(&content, args.output.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nl2sql_core::llm::Stage;
    use nl2sql_core::{ConfigError, OracleMode};
    use tempfile::TempDir;

    fn args(config: Option<PathBuf>) -> SolveArgs {
        SolveArgs {
            database: PathBuf::from("company.db"),
            question: "How many employees?".into(),
            schema: None,
            config,
            model: None,
            max_iterations: None,
            verbose: false,
            format: OutputFormat::Text,
            output: None,
        }
    }

    fn write_config(dir: &TempDir, yaml: &str) -> PathBuf {
        let path = dir.path().join("agent_config.yaml");
        std::fs::write(&path, yaml).unwrap();
        path
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            "max_iterations: 5\noracle:\n  mode: ollama\n  model: codellama\n",
        );

        let config = load_config(&args(Some(path))).unwrap();
        assert_eq!(config.max_iterations, 5);
        assert_eq!(config.oracle.mode, OracleMode::Ollama);
        assert_eq!(config.oracle.model, "codellama");
        assert!(!config.verbose);
    }

    #[test]
    fn test_load_config_overrides() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "oracle:\n  mode: ollama\n  model: codellama\n");

        let mut solve_args = args(Some(path));
        solve_args.model = Some("llama3.2".into());
        solve_args.max_iterations = Some(0);
        solve_args.verbose = true;

        let config = load_config(&solve_args).unwrap();
        assert_eq!(config.oracle.model, "llama3.2");
        assert_eq!(config.max_iterations, 0);
        assert!(config.verbose);
    }

    #[test]
    fn test_load_config_agent_stage_sections() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            "max_iterations: 2\n\
             selector:\n  model: gpt-4o-mini\n  openai_api_key: sk-a\n\
             decomposer:\n  model: gpt-4o\n  openai_api_key: sk-b\n\
             refiner:\n  model: gpt-4o\n  openai_api_key: sk-c\n",
        );

        let mut solve_args = args(Some(path));
        solve_args.model = Some("gpt-4.1".into());

        let config = load_config(&solve_args).unwrap();
        assert_eq!(config.max_iterations, 2);
        let refine = config.oracle_for(Stage::Refine);
        assert_eq!(refine.model, "gpt-4.1");
        assert_eq!(refine.api_key(), Some("sk-c"));
    }

    #[test]
    fn test_load_config_rejects_empty_model() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "oracle:\n  mode: ollama\n");

        let mut solve_args = args(Some(path));
        solve_args.model = Some("  ".into());

        let result = load_config(&solve_args);
        assert!(matches!(
            result,
            Err(CliError::Config(ConfigError::InvalidValue { .. }))
        ));
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config(&args(Some(PathBuf::from("/nonexistent/agent_config.yaml"))));
        assert!(matches!(result, Err(CliError::Config(ConfigError::Read { .. }))));
    }

    #[tokio::test]
    async fn test_handle_solve_rejects_blank_question() {
        let mut solve_args = args(None);
        solve_args.question = "   ".into();
        let result = handle_solve(&solve_args).await;
        assert!(matches!(result, Err(CliError::InvalidArgument(_))));
    }
}
