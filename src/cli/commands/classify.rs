//! Classify command implementation

use super::load_input;
use crate::cli::error::CliError;
use crate::import::classify;

/// Handle the classify command: prints `ddl`, `dbml`, `query` or `unknown`
pub fn handle_classify(input: &str) -> Result<(), CliError> {
    let content = load_input(input)?;
    match classify(&content) {
        Some(content_type) => println!("{}", content_type),
        None => println!("unknown"),
    }
    Ok(())
}
