pub mod events;
pub mod executor;
pub mod state;

pub use events::*;
pub use state::*;

use anyhow::Result;
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::driver::web::{BrowserType, WebDriver, WebDriverConfig};
use crate::utils::Config;

/// Run test suites from a file or directory
pub async fn run_tests(
    path: &Path,
    output: &Path,
    browser: Option<&str>,
    headless: bool,
    continue_on_failure: bool,
    snapshot: bool,
    report: bool,
) -> Result<RunSummary> {
    // 1. Collect suite files
    let mut all_files: Vec<PathBuf> = Vec::new();
    if path.is_dir() {
        for entry in walkdir::WalkDir::new(path)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map_or(false, |ext| ext == "json")
            })
        {
            all_files.push(entry.path().to_path_buf());
        }
        all_files.sort();
    } else {
        all_files.push(path.to_path_buf());
    }

    if all_files.is_empty() {
        println!("{} No test files found.", "ℹ".blue());
        return Ok(SessionState::new("empty").summary());
    }

    // 2. Launch the browser
    let mut driver_config = WebDriverConfig::default();
    if headless {
        driver_config.headless = true;
    }
    if let Some(browser) = browser {
        driver_config.browser_type = match browser.to_lowercase().as_str() {
            "firefox" => BrowserType::Firefox,
            "webkit" => BrowserType::Webkit,
            _ => BrowserType::Chromium,
        };
    }
    let driver = Arc::new(WebDriver::new(driver_config).await?);

    // 3. Execute all suites through one session
    let mut executor = executor::StepExecutor::new(
        driver,
        output,
        Config::default(),
        continue_on_failure,
        snapshot,
        report,
    );

    for file in &all_files {
        println!(
            "{} Running suite: {}",
            "▶".green().bold(),
            file.display()
        );
        executor.run_file(file).await?;
    }

    let summary = executor.finish().await?;

    // 4. Closing per-case summary
    println!("\nTest Results Summary:");
    for case in &executor.session().cases {
        let status = match case.status {
            CaseStatus::Passed => "PASS".green(),
            CaseStatus::Failed => format!(
                "FAIL: {}",
                case.error.as_deref().unwrap_or("unknown error")
            )
            .red(),
            CaseStatus::PartiallyPassed { passed, failed } => {
                format!("PARTIAL ({} passed, {} failed)", passed, failed).yellow()
            }
            _ => "UNKNOWN".white(),
        };
        println!("{}: {}", case.case_name, status);
    }

    Ok(summary)
}
