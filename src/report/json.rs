use super::types::TestResults;
use anyhow::Result;
use std::path::Path;

/// Generate JSON report to stdout or a file
pub async fn generate(results: &TestResults, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(results)?;

    if let Some(path) = output {
        std::fs::write(path, json)?;
        println!("JSON report saved to: {}", path.display());
    } else {
        println!("{}", json);
    }

    Ok(())
}

/// Write results.json into the output directory
pub fn write_report(results: &TestResults, output_dir: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(results)?;
    let path = output_dir.join("results.json");
    std::fs::write(&path, json)?;
    println!("    Generated JSON report: {}", path.display());
    Ok(())
}
