pub mod check;
pub mod run;

pub use check::{check, CheckArgs};
pub use run::{run, RunArgs};

use anyhow::{Context, Result};
use serde_json::Value;
use std::path::Path;

/// Read and parse a JSON file
pub(crate) fn read_json(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path).with_context(|| format!("Cannot read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {}", path.display()))
}
