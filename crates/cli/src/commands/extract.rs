//! Extract command implementation

use std::io::Read;
use std::path::{Path, PathBuf};

use nl2sql_core::extract_sql;

use crate::error::CliError;

/// Arguments for the `extract` command
pub struct ExtractArgs {
    /// File holding the oracle response (stdin if not provided or `-`)
    pub input: Option<PathBuf>,
}

/// Load input content from file or stdin
fn load_input(input: Option<&Path>) -> Result<String, CliError> {
    match input {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
            .map_err(|e| CliError::FileReadError(path.to_path_buf(), e.to_string())),
        _ => {
            let mut content = String::new();
            std::io::stdin()
                .read_to_string(&mut content)
                .map_err(|e| CliError::InvalidArgument(format!("Failed to read stdin: {}", e)))?;
            Ok(content)
        }
    }
}

/// Handle the `extract` command
pub fn handle_extract(args: &ExtractArgs) -> Result<(), CliError> {
    let content = load_input(args.input.as_deref())?;
    println!("{}", extract_sql(&content));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_input_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("response.txt");
        std::fs::write(&path, "```sql\nSELECT 1;\n```").unwrap();

        let content = load_input(Some(&path)).unwrap();
        assert_eq!(extract_sql(&content), "SELECT 1;");
    }

    #[test]
    fn test_load_input_missing_file() {
        let result = load_input(Some(Path::new("/nonexistent/response.txt")));
        assert!(matches!(result, Err(CliError::FileReadError(..))));
    }
}
