//! Prompt templates for the solver stages
//!
//! Each stage pairs a fixed system prompt with a user prompt built from the
//! question and a rendering of the schema. The refine prompt additionally
//! carries the failed SQL and the exact database error.

use crate::schema::Schema;

/// Guard shared by every system prompt
const NAME_GUARD: &str = "IMPORTANT: You must ONLY use table and column names exactly as shown in the schema. \
Do NOT invent or guess any table or column names.";

/// System prompt for schema pruning
pub const SELECTOR_SYSTEM_PROMPT: &str = r#"{guard}
You are an expert database analyst who identifies the schema elements needed to answer a question.

Select ONLY the tables and columns that are necessary to answer the question.

## Guidelines
1. Identify the entities and relationships the question needs.
2. Include tables required to JOIN the relevant entities.
3. Include columns needed for grouping, filtering and aggregation.
4. If in doubt about a table or column, include it.

## Output
Return ONLY a JSON object of the form:
{"tables": [{"name": "table_name", "columns": ["column1", "column2"]}]}"#;

/// System prompt for first-draft SQL generation
pub const GENERATOR_SYSTEM_PROMPT: &str = r#"{guard}
You are an expert in SQL query generation for SQLite. Convert the question into a SQL query using step-by-step reasoning.

## Steps
1. Identify the entities, attributes and conditions in the question.
2. Break complex questions into simpler sub-questions.
3. Find the tables, joins and columns that answer each sub-question.
4. Build the query from SELECT, FROM and WHERE, then add JOIN, GROUP BY, HAVING, ORDER BY and LIMIT as needed.
5. Check that every condition in the question is represented.

## Output
Your final answer MUST contain the complete query wrapped in ```sql and ``` tags, for example:
```sql
SELECT column1 FROM table1 WHERE condition;
```"#;

/// System prompt for repairing a failed query
pub const REFINER_SYSTEM_PROMPT: &str = r#"{guard}
You are an expert SQL fixer. Given a database schema, a previous SQL query and the error it produced, write a corrected SQLite query that will execute successfully.
Only return the SQL code in a code block (```sql ... ```)."#;

const SELECTOR_PROMPT_TEMPLATE: &str = r#"Question: {question}

Full Database Schema:
{schema}

Please select only the relevant tables and columns for answering this question."#;

const GENERATOR_PROMPT_TEMPLATE: &str = r#"Question: {question}

Database Schema:
{schema}

Please generate a SQL query to answer this question. Use step-by-step reasoning."#;

const REFINER_PROMPT_TEMPLATE: &str = r#"Question: {question}

Database Schema:
{schema}

Previous SQL:
{prior_sql}

Error Message:
{error}

Please refine or fix the SQL query so that it runs successfully."#;

/// Solver stage a prompt is built for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Prune,
    Generate,
    Refine,
}

impl Stage {
    /// System prompt for the stage
    pub fn system_prompt(&self) -> String {
        let template = match self {
            Stage::Prune => SELECTOR_SYSTEM_PROMPT,
            Stage::Generate => GENERATOR_SYSTEM_PROMPT,
            Stage::Refine => REFINER_SYSTEM_PROMPT,
        };
        template.replace("{guard}", NAME_GUARD)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Prune => "prune",
            Stage::Generate => "generate",
            Stage::Refine => "refine",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs shared by all stage prompts
#[derive(Debug, Clone)]
pub struct PromptContext<'a> {
    /// The natural-language question
    pub question: &'a str,
    /// Schema the oracle is allowed to use
    pub schema: &'a Schema,
}

impl<'a> PromptContext<'a> {
    /// Create a new prompt context
    pub fn new(question: &'a str, schema: &'a Schema) -> Self {
        Self { question, schema }
    }

    /// Prompt asking which tables and columns are relevant
    pub fn selector_prompt(&self) -> String {
        fill(
            SELECTOR_PROMPT_TEMPLATE,
            &[
                ("question", self.question),
                ("schema", &self.schema.render_selector()),
            ],
        )
    }

    /// Prompt asking for a first-draft query
    pub fn generator_prompt(&self) -> String {
        fill(
            GENERATOR_PROMPT_TEMPLATE,
            &[
                ("question", self.question),
                ("schema", &self.schema.render_detailed()),
            ],
        )
    }

    /// Prompt asking to repair `prior_sql`, which failed with `error`
    ///
    /// The error text is inserted verbatim.
    pub fn refiner_prompt(&self, prior_sql: &str, error: &str) -> String {
        fill(
            REFINER_PROMPT_TEMPLATE,
            &[
                ("question", self.question),
                ("schema", &self.schema.render_summary()),
                ("prior_sql", prior_sql),
                ("error", error),
            ],
        )
    }
}

/// Substitute `{name}` placeholders in a single pass
///
/// Values are inserted verbatim, so placeholders appearing inside a value
/// are never expanded.
fn fill(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 1..];
        let hit = vars.iter().find(|(key, _)| {
            tail.strip_prefix(*key)
                .is_some_and(|after| after.starts_with('}'))
        });
        match hit {
            Some((key, value)) => {
                out.push_str(value);
                rest = &tail[key.len() + 1..];
            }
            None => {
                out.push('{');
                rest = tail;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Extract JSON from a response that may contain markdown or other text
///
/// Tries a ```` ```json ```` block, then any fenced block, then the span from
/// the first `{` to the last `}`, and finally returns the trimmed text.
pub fn extract_json(response: &str) -> String {
    let trimmed = response.trim();

    if let Some(start) = trimmed.find("```json") {
        let content_start = start + 7;
        if let Some(end) = trimmed[content_start..].find("```") {
            return trimmed[content_start..content_start + end]
                .trim()
                .to_string();
        }
    }

    if let Some(start) = trimmed.find("```") {
        let content_start = start + 3;
        // Skip language identifier if present
        let content_start = trimmed[content_start..]
            .find('\n')
            .map(|n| content_start + n + 1)
            .unwrap_or(content_start);
        if let Some(end) = trimmed[content_start..].find("```") {
            return trimmed[content_start..content_start + end]
                .trim()
                .to_string();
        }
    }

    if let Some(start) = trimmed.find('{') {
        if let Some(end) = trimmed.rfind('}') {
            if end > start {
                return trimmed[start..=end].to_string();
            }
        }
    }

    trimmed.to_string()
}

/// Estimate the token count for a piece of text
///
/// Uses a rough estimate of 4 characters per token
pub fn estimate_tokens(text: &str) -> usize {
    text.len().div_ceil(4)
}
