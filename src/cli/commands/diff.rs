//! Diff command implementation

use super::load_input;
use crate::cli::error::CliError;
use crate::cli::output::format_changes;
use crate::diff::diff;
use crate::models::Diagram;

fn load_diagram(input: &str) -> Result<Diagram, CliError> {
    let content = load_input(input)?;
    serde_json::from_str(&content).map_err(|e| CliError::InvalidDiagram(input.to_string(), e.to_string()))
}

/// Handle the diff command: compares two diagram snapshots saved as JSON
pub fn handle_diff(before: &str, after: &str, text: bool) -> Result<(), CliError> {
    if before == "-" && after == "-" {
        return Err(CliError::InvalidArgument("Only one snapshot can be read from stdin".to_string()));
    }
    let before = load_diagram(before)?;
    let after = load_diagram(after)?;
    let changes = diff(&before, &after);

    if text {
        print!("{}", format_changes(&changes));
    } else {
        println!("{}", serde_json::to_string_pretty(&changes)?);
    }
    Ok(())
}
