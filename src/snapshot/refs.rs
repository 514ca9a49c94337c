//! URL extraction from reference documents.

use anyhow::{bail, Context, Result};
use regex::Regex;
use std::path::Path;

/// Extract unique http(s) URLs from a markdown file, in first-seen order.
pub fn extract_urls_from_markdown(path: &Path) -> Result<Vec<String>> {
    if path.extension().and_then(|e| e.to_str()) != Some("md") {
        bail!("Not a markdown file: {}", path.display());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read markdown file: {}", path.display()))?;
    Ok(extract_urls(&content))
}

/// Unique http(s) URLs in the text, first-seen order.
pub fn extract_urls(content: &str) -> Vec<String> {
    let re = Regex::new(r#"https?://[^\s"'\)\]<>]+"#).unwrap();

    let mut out: Vec<String> = Vec::new();
    for m in re.find_iter(content) {
        let url = m.as_str().trim_end_matches(['.', ',', ';']).to_string();
        if !out.contains(&url) {
            out.push(url);
        }
    }
    out
}
