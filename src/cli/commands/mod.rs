//! CLI command implementations

pub mod classify;
pub mod diff;
pub mod import;

use crate::cli::error::CliError;
use std::io::Read;
use std::path::PathBuf;

/// Load input content from file or stdin (`-`)
pub fn load_input(input: &str) -> Result<String, CliError> {
    if input == "-" {
        let mut content = String::new();
        std::io::stdin()
            .read_to_string(&mut content)
            .map_err(|e| CliError::InvalidArgument(format!("Failed to read stdin: {}", e)))?;
        Ok(content)
    } else {
        let path = PathBuf::from(input);
        std::fs::read_to_string(&path).map_err(|e| CliError::FileReadError(path, e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_input_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "CREATE TABLE t (id INT);").unwrap();
        let content = load_input(file.path().to_str().unwrap()).unwrap();
        assert_eq!(content, "CREATE TABLE t (id INT);");
    }

    #[test]
    fn test_load_input_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.sql");
        let err = load_input(missing.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, CliError::FileReadError(path, _) if path == missing));
    }
}
