//! SQL extraction from free-form oracle text
//!
//! Oracle replies mix reasoning prose with the query. Extraction looks for a
//! fenced ```` ```sql ```` block first, then scans for statements led by
//! `SELECT` or `WITH`, and finally returns [`SENTINEL_SQL`].

use once_cell::sync::Lazy;
use regex::Regex;
use sqlparser::dialect::SQLiteDialect;
use sqlparser::parser::Parser;

/// Statement returned when no SQL can be found
pub const SENTINEL_SQL: &str = "SELECT 'ERROR: Could not generate SQL';";

static SQL_FENCE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)```sql\b[ \t]*\r?\n?(.*?)```").unwrap());

static KEYWORD_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b(select|with)\b").unwrap());

/// Pull one SQL statement out of `text`
///
/// Never fails and never returns an empty string. The first non-empty
/// ```` ```sql ```` block wins. Without one, the last keyword-led statement
/// wins, with `;` appended when missing.
///
/// # Example
///
/// ```rust
/// use nl2sql_core::sql::{SENTINEL_SQL, extract_sql};
///
/// assert_eq!(extract_sql("So the answer is SELECT 1"), "SELECT 1;");
/// assert_eq!(extract_sql("I am not sure."), SENTINEL_SQL);
/// ```
pub fn extract_sql(text: &str) -> String {
    if let Some(sql) = first_fenced_block(text) {
        return sql;
    }

    // Fenced blocks take the first match but bare statements take the last:
    // replies tend to restate the final query after the reasoning.
    if let Some(sql) = keyword_statements(text).pop() {
        return terminate(sql);
    }

    tracing::warn!("Could not extract SQL from oracle response");
    SENTINEL_SQL.to_string()
}

/// Whether `sql` is the extraction failure statement
pub fn is_sentinel(sql: &str) -> bool {
    sql.trim() == SENTINEL_SQL
}

fn first_fenced_block(text: &str) -> Option<String> {
    SQL_FENCE_REGEX
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .find(|sql| !sql.is_empty())
        .map(str::to_string)
}

/// Keyword-led statements in order of appearance
///
/// A statement runs from its keyword to the first `;` (inclusive), the next
/// code fence, or the end of text. Keywords inside an accepted statement
/// are not rescanned, so subqueries and CTE bodies stay part of the outer
/// statement.
fn keyword_statements(text: &str) -> Vec<&str> {
    let mut statements = Vec::new();
    let mut cursor = 0;

    for m in KEYWORD_REGEX.find_iter(text) {
        if m.start() < cursor {
            continue;
        }

        let rest = &text[m.start()..];
        let end = statement_end(rest);
        let candidate = rest[..end].trim();

        if is_plausible_sql(m.as_str(), candidate) {
            statements.push(candidate);
            cursor = m.start() + end;
        }
    }

    statements
}

fn statement_end(rest: &str) -> usize {
    let semicolon = rest.find(';').map(|i| i + 1);
    let fence = rest.find("```");
    match (semicolon, fence) {
        (Some(s), Some(f)) => s.min(f),
        (Some(s), None) => s,
        (None, Some(f)) => f,
        (None, None) => rest.len(),
    }
}

/// Upper-case keywords are taken as SQL; other casings must parse
fn is_plausible_sql(keyword: &str, candidate: &str) -> bool {
    if keyword.chars().all(|c| c.is_ascii_uppercase()) {
        return true;
    }
    Parser::parse_sql(&SQLiteDialect {}, candidate).is_ok()
}

fn terminate(sql: &str) -> String {
    let sql = sql.trim_end();
    if sql.ends_with(';') {
        sql.to_string()
    } else {
        format!("{};", sql)
    }
}
