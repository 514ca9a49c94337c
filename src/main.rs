use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use adapt_tester::{report, runner, snapshot};

#[derive(Parser)]
#[command(name = "adapt-tester")]
#[command(author = "Adapt Team")]
#[command(version = "0.1.0")]
#[command(about = "Self-healing web automation testing CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run test suite file(s) or a directory of suites
    Run {
        /// Path to a suite JSON file or directory
        path: PathBuf,

        /// Output directory for reports and artifacts
        #[arg(short, long, default_value = "./output")]
        output: PathBuf,

        /// Browser engine (chromium, firefox, webkit)
        #[arg(short, long)]
        browser: Option<String>,

        /// Run the browser headless
        #[arg(long, default_value = "false")]
        headless: bool,

        /// Continue past a failed step within a case
        #[arg(long, default_value = "false")]
        continue_on_failure: bool,

        /// Capture a screenshot when a step fails
        #[arg(long, short = 's', default_value = "false")]
        snapshot: bool,

        /// Generate reports (JSON, JUnit)
        #[arg(long, default_value = "false")]
        report: bool,
    },

    /// Generate a report from saved test results
    Report {
        /// Path to test results JSON
        results: PathBuf,

        /// Output format (json, junit)
        #[arg(short, long, default_value = "json")]
        format: String,

        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Fetch and cache HTML snapshots of pages
    Snapshot {
        /// Page URL to snapshot
        #[arg(short, long)]
        url: Option<String>,

        /// Markdown file whose referenced URLs are all snapshotted
        #[arg(short, long)]
        markdown: Option<PathBuf>,

        /// Snapshot cache directory
        #[arg(short, long, default_value = "./data/snaps")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            path,
            output,
            browser,
            headless,
            continue_on_failure,
            snapshot,
            report,
        } => {
            println!(
                "{} Running tests from: {}",
                "▶".green().bold(),
                path.display()
            );
            println!("  Output: {}", output.display().to_string().cyan());
            if let Some(ref b) = browser {
                println!("  Browser: {}", b.cyan());
            }
            if headless {
                println!("  Headless: {}", "Enabled".green());
            }
            if snapshot {
                println!("  Snapshots: {}", "Enabled".green());
            }
            if report {
                println!("  Reports: {}", "Enabled".green());
            }

            let summary = runner::run_tests(
                &path,
                &output,
                browser.as_deref(),
                headless,
                continue_on_failure,
                snapshot,
                report,
            )
            .await?;

            if summary.failed > 0 {
                std::process::exit(1);
            }
        }

        Commands::Report {
            results,
            format,
            output,
        } => {
            println!(
                "{} Generating {} report from: {}",
                "📊".to_string().blue(),
                format.cyan(),
                results.display()
            );
            report::generate_report(&results, &format, output.as_deref()).await?;
        }

        Commands::Snapshot {
            url,
            markdown,
            output,
        } => {
            let mut urls: Vec<String> = Vec::new();

            if let Some(ref md) = markdown {
                println!("{} Extracting URLs from: {}", "🔍".blue(), md.display());
                let found = snapshot::refs::extract_urls_from_markdown(md)?;
                println!("Found {} URLs", found.len());
                urls.extend(found);
            }
            if let Some(url) = url {
                if !urls.contains(&url) {
                    urls.push(url);
                }
            }

            if urls.is_empty() {
                anyhow::bail!("Provide --url and/or --markdown with URLs to snapshot");
            }

            for url in &urls {
                match snapshot::fetch_and_save_html(url, &output).await {
                    Ok(_) => {}
                    Err(e) => eprintln!("{} Failed to snapshot {}: {:#}", "⚠️".yellow(), url, e),
                }
            }
        }
    }

    Ok(())
}
