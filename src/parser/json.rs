use anyhow::{Context, Result};
use std::path::Path;

use super::types::TestSuite;

/// Parse a test suite from a JSON file.
///
/// Unknown `action` or `locator.type` values are rejected here, before any
/// browser work starts: a malformed step file is a configuration error, not
/// something the fallback engine should paper over.
pub fn parse_suite_file(path: &Path) -> Result<TestSuite> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read test file: {}", path.display()))?;
    parse_suite_content(&content)
        .with_context(|| format!("Failed to parse test file: {}", path.display()))
}

/// Parse a test suite from raw JSON content.
pub fn parse_suite_content(content: &str) -> Result<TestSuite> {
    let suite: TestSuite = serde_json::from_str(content)?;
    Ok(suite)
}
