//! Import command implementation

use super::load_input;
use crate::cli::error::CliError;
use crate::cli::output::format_import_summary;
use crate::import::{import_auto, ImportConfig};
use crate::models::DatabaseType;
use std::path::Path;
use tracing::info;

/// How the import result is printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Summary,
}

impl std::str::FromStr for OutputFormat {
    type Err = CliError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(OutputFormat::Json),
            "summary" => Ok(OutputFormat::Summary),
            other => Err(CliError::InvalidArgument(format!("Unknown output format: {}", other))),
        }
    }
}

/// Read an `ImportConfig` from a TOML file
pub fn load_config(path: &Path) -> Result<ImportConfig, CliError> {
    let text = std::fs::read_to_string(path).map_err(|e| CliError::FileReadError(path.to_path_buf(), e.to_string()))?;
    toml::from_str(&text).map_err(|e| CliError::ConfigError(path.to_path_buf(), e.to_string()))
}

/// Handle the import command
pub fn handle_import(
    input: &str,
    engine: Option<&str>,
    format: OutputFormat,
    config_path: Option<&Path>,
) -> Result<(), CliError> {
    let mut config = match config_path {
        Some(path) => load_config(path)?,
        None => ImportConfig::default(),
    };
    if let Some(engine) = engine {
        config.database_type = engine.parse::<DatabaseType>().map_err(CliError::InvalidArgument)?;
    }
    info!("Importing {} as {}", input, config.database_type);

    let content = load_input(input)?;
    let outcome = import_auto(&content, &config)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome.diagram)?),
        OutputFormat::Summary => print!("{}", format_import_summary(&outcome)),
    }
    for warning in &outcome.warnings {
        tracing::warn!("{}", warning);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_config_from_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "databaseType = \"mysql\"\nregexFallback = false").unwrap();
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.database_type, DatabaseType::MySql);
        assert!(!config.regex_fallback);
        assert!(config.auto_fix);
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!("summary".parse::<OutputFormat>().unwrap(), OutputFormat::Summary);
        assert!("xml".parse::<OutputFormat>().is_err());
    }
}
