use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

/// Pretty-print any serializable value as JSON to stdout.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{json}");
    Ok(())
}

/// Write a stage result to `out` if given, else print it. JSON values are
/// pretty-printed, plain text is written as is.
pub fn emit(result: &StageOutput, out: Option<&Path>) -> Result<()> {
    let rendered = match result {
        StageOutput::Text(text) => text.clone(),
        StageOutput::Json(value) => serde_json::to_string_pretty(value)?,
    };
    match out {
        Some(path) => std::fs::write(path, format!("{rendered}\n"))
            .with_context(|| format!("Failed to write: {}", path.display())),
        None => {
            println!("{rendered}");
            Ok(())
        }
    }
}

/// Output of one pipeline stage.
#[derive(Debug, Clone)]
pub enum StageOutput {
    Text(String),
    Json(serde_json::Value),
}
