//! The refinement loop
//!
//! Prune the schema, generate a statement, then execute and refine until a
//! statement runs or the refinement budget is spent. With a budget of `n`
//! the loop makes at most `n` refinement calls and `n + 1` executions, and
//! always returns the last statement it tried.

use std::time::Instant;

use chrono::Utc;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use super::error::{SolveError, SolveResult};
use super::trace::{Attempt, AttemptOutcome, Trace};
use crate::config::SolverConfig;
use crate::llm::client::{LlmClient, client_from_config, complete_with_retry};
use crate::llm::error::LlmResult;
use crate::llm::prompt::{PromptContext, Stage, estimate_tokens};
use crate::schema::{Schema, prune};
use crate::sql::{
    DatabaseTarget, ExecutionResult, Executor, SENTINEL_SQL, SqliteExecutor, extract_sql,
};

/// Question solver driving an oracle and an executor
///
/// Holds no per-question state, so one loop can serve any number of
/// independent `solve` calls.
pub struct RefinementLoop<C, E> {
    /// Oracle for every stage without its own client
    client: C,
    stage_clients: Vec<(Stage, C)>,
    executor: E,
    config: SolverConfig,
}

impl RefinementLoop<Box<dyn LlmClient>, SqliteExecutor> {
    /// Build a loop with the configured oracles and a SQLite executor
    ///
    /// The generation oracle is the default. Pruning and refinement get a
    /// client of their own when their stage section changes the oracle.
    pub fn from_config(config: SolverConfig) -> LlmResult<Self> {
        let generate = config.oracle_for(Stage::Generate);
        let mut solver = Self::new(
            client_from_config(&generate)?,
            SqliteExecutor::new(),
            config.clone(),
        );

        for stage in [Stage::Prune, Stage::Refine] {
            let oracle = config.oracle_for(stage);
            if oracle != generate {
                debug!(stage = %stage, model = %oracle.model, "Stage uses its own oracle");
                solver = solver.with_stage_client(stage, client_from_config(&oracle)?);
            }
        }
        Ok(solver)
    }
}

impl<C: LlmClient, E: Executor> RefinementLoop<C, E> {
    pub fn new(client: C, executor: E, config: SolverConfig) -> Self {
        Self {
            client,
            stage_clients: Vec::new(),
            executor,
            config,
        }
    }

    /// Route one stage's oracle calls to a dedicated client
    pub fn with_stage_client(mut self, stage: Stage, client: C) -> Self {
        self.stage_clients.retain(|(s, _)| *s != stage);
        self.stage_clients.push((stage, client));
        self
    }

    /// The client answering `stage`
    pub fn client_for(&self, stage: Stage) -> &C {
        self.stage_clients
            .iter()
            .find(|(s, _)| *s == stage)
            .map(|(_, client)| client)
            .unwrap_or(&self.client)
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Answer `question` against `target`, returning the final SQL and trace
    ///
    /// Fails only when the schema is invalid, the database cannot be opened,
    /// or the oracle is unreachable or misconfigured. Exhausting the budget
    /// is a normal result; check [`Trace::status`].
    pub async fn solve(
        &self,
        question: &str,
        schema: &Schema,
        target: &DatabaseTarget,
    ) -> SolveResult<(String, Trace)> {
        let run_id = Uuid::new_v4();
        let span = info_span!("solve", run_id = %run_id, question = %question);
        self.run(run_id, question, schema, target)
            .instrument(span)
            .await
    }

    async fn run(
        &self,
        run_id: Uuid,
        question: &str,
        schema: &Schema,
        target: &DatabaseTarget,
    ) -> SolveResult<(String, Trace)> {
        let started_at = Utc::now();
        let start = Instant::now();

        schema.validate()?;
        self.executor.probe(target)?;

        info!(
            database = %target,
            tables = schema.tables.len(),
            max_iterations = self.config.max_iterations,
            model = self.client.model_name(),
            "Solving question"
        );

        let max_retries = self.config.oracle.max_retries;
        let pruned = prune(self.client_for(Stage::Prune), question, schema, max_retries)
            .await
            .map_err(|source| SolveError::Oracle {
                stage: Stage::Prune,
                source,
            })?;
        let prune_fell_back = pruned.is_fallback();
        let pruned_schema = pruned.into_schema();

        let context = PromptContext::new(question, &pruned_schema);

        let mut current_sql = self.ask(Stage::Generate, &context.generator_prompt()).await?;
        let mut previous_sql: Option<String> = None;
        let mut attempts: Vec<Attempt> = Vec::new();

        loop {
            let index = attempts.len();
            let (outcome, duration_ms) = self.execute(target, &current_sql);

            attempts.push(Attempt {
                index,
                sql: current_sql.clone(),
                previous_sql: previous_sql.take(),
                outcome: outcome.clone(),
                duration_ms,
            });

            let message = match outcome {
                AttemptOutcome::Success { row_count, .. } => {
                    info!(attempt = index, rows = row_count, duration_ms, "Statement succeeded");
                    break;
                }
                AttemptOutcome::ExecutionError { message } => message,
            };

            if index >= self.config.max_iterations {
                warn!(
                    attempt = index,
                    error = %message,
                    "Refinement budget exhausted"
                );
                break;
            }

            info!(
                attempt = index,
                iteration = index + 1,
                error = %message,
                "Statement failed, refining"
            );
            let refined = self
                .ask(Stage::Refine, &context.refiner_prompt(&current_sql, &message))
                .await?;
            previous_sql = Some(std::mem::replace(&mut current_sql, refined));
        }

        let trace = Trace {
            run_id,
            started_at,
            question: question.to_string(),
            pruned_schema,
            prune_fell_back,
            attempts,
            final_sql: current_sql.clone(),
            duration_ms: start.elapsed().as_millis() as u64,
        };

        info!(
            status = %trace.status(),
            attempts = trace.attempts.len(),
            duration_ms = trace.duration_ms,
            "Solve finished"
        );

        Ok((current_sql, trace))
    }

    /// Execute a candidate, timing it
    ///
    /// The extraction sentinel runs like any other statement.
    fn execute(&self, target: &DatabaseTarget, sql: &str) -> (AttemptOutcome, u64) {
        let start = Instant::now();
        let result = self.executor.run(target, sql);
        let duration_ms = start.elapsed().as_millis() as u64;

        if let ExecutionResult::Failure { message } = &result {
            debug!(error = %message, sql = %sql, "Execution failed");
        }
        (AttemptOutcome::from(&result), duration_ms)
    }

    /// One oracle round trip, reduced to a statement
    async fn ask(&self, stage: Stage, prompt: &str) -> SolveResult<String> {
        let system = stage.system_prompt();
        let client = self.client_for(stage);
        let prompt_tokens = estimate_tokens(&system) + estimate_tokens(prompt);
        if prompt_tokens > client.max_tokens() {
            warn!(
                stage = %stage,
                prompt_tokens,
                max_tokens = client.max_tokens(),
                "Prompt exceeds the oracle context window"
            );
        }
        if self.config.verbose {
            debug!(
                stage = %stage,
                prompt_tokens,
                "Oracle prompt:\n{}\n\n{}",
                system,
                prompt
            );
        }

        match complete_with_retry(client, &system, prompt, self.config.oracle.max_retries)
            .await
        {
            Ok(response) => {
                if self.config.verbose {
                    debug!(
                        stage = %stage,
                        model = client.model_name(),
                        "Oracle response:\n{}",
                        response
                    );
                }
                let sql = extract_sql(&response);
                debug!(stage = %stage, sql = %sql, "Extracted statement");
                Ok(sql)
            }
            Err(source) if source.is_resource_error() => Err(SolveError::Oracle { stage, source }),
            Err(e) => {
                warn!(stage = %stage, error = %e, "Unusable oracle response, using sentinel");
                Ok(SENTINEL_SQL.to_string())
            }
        }
    }
}
