use super::state::{CaseStatus, RunSummary};
use tokio::sync::broadcast;

/// Test execution events for real-time console output
#[derive(Debug, Clone)]
pub enum TestEvent {
    SessionStarted {
        session_id: String,
    },
    SessionFinished {
        summary: RunSummary,
    },

    CaseStarted {
        case_name: String,
        step_count: usize,
    },
    CaseFinished {
        case_name: String,
        status: CaseStatus,
        duration_ms: Option<u64>,
    },

    StepStarted {
        index: usize,
        step: String,
    },
    StepPassed {
        index: usize,
        duration_ms: u64,
    },
    StepFailed {
        index: usize,
        error: String,
        duration_ms: u64,
    },
    StepSkipped {
        index: usize,
        reason: String,
    },

    Log {
        message: String,
    },
}

/// Event emitter for broadcasting test events
pub struct EventEmitter {
    sender: broadcast::Sender<TestEvent>,
}

impl EventEmitter {
    pub fn new() -> (Self, broadcast::Receiver<TestEvent>) {
        let (sender, receiver) = broadcast::channel(100);
        (Self { sender }, receiver)
    }

    pub fn emit(&self, event: TestEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TestEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        let (sender, _) = broadcast::channel(100);
        Self { sender }
    }
}

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration as StdDuration;

/// Console event listener for printing real-time updates
pub struct ConsoleEventListener;

impl ConsoleEventListener {
    pub async fn listen(mut receiver: broadcast::Receiver<TestEvent>) {
        use colored::Colorize;
        use std::io::IsTerminal;

        // Hidden draw target when piped, to keep logs free of escape codes
        let multi = if std::io::stdout().is_terminal() {
            MultiProgress::new()
        } else {
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
        };

        let mut spinner: Option<ProgressBar> = None;
        let mut step_text = String::new();

        while let Ok(event) = receiver.recv().await {
            match event {
                TestEvent::SessionStarted { session_id } => {
                    multi
                        .println(format!(
                            "\n{} Test session started: {}",
                            "▶".green().bold(),
                            session_id.cyan()
                        ))
                        .ok();
                }

                TestEvent::SessionFinished { summary } => {
                    if let Some(pb) = spinner.take() {
                        pb.finish();
                    }

                    println!("\n{} Test session finished", "■".blue().bold());
                    println!("  Total cases: {}", summary.total_cases);
                    println!("  Total steps: {}", summary.total_steps);
                    println!(
                        "  {} passed, {} failed, {} skipped",
                        summary.passed.to_string().green(),
                        summary.failed.to_string().red(),
                        summary.skipped.to_string().yellow()
                    );
                    if let Some(duration) = summary.total_duration_ms {
                        println!("  Duration: {}ms", duration);
                    }
                }

                TestEvent::CaseStarted {
                    case_name,
                    step_count,
                } => {
                    println!(
                        "\n  {} Case: {} ({} steps)",
                        "→".blue(),
                        case_name.white().bold(),
                        step_count
                    );
                }

                TestEvent::CaseFinished {
                    case_name,
                    status,
                    duration_ms,
                } => {
                    if let Some(pb) = spinner.take() {
                        pb.finish();
                    }

                    let status_str = match status {
                        CaseStatus::Passed => "PASS".green().bold(),
                        CaseStatus::Failed => "FAIL".red().bold(),
                        CaseStatus::PartiallyPassed { passed, failed } => {
                            format!("PARTIAL ({}/{} passed)", passed, passed + failed)
                                .yellow()
                                .bold()
                        }
                        _ => "UNKNOWN".white().bold(),
                    };
                    println!("  {} Case {} [{}]", "←".blue(), case_name, status_str);
                    if let Some(duration) = duration_ms {
                        println!("    Duration: {}ms", duration);
                    }
                }

                TestEvent::StepStarted { index, step } => {
                    let pb = multi.add(ProgressBar::new_spinner());
                    let style = ProgressStyle::default_spinner()
                        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
                        .template("    {spinner} {msg}")
                        .unwrap();
                    pb.set_style(style);

                    let body = format!("[{}] {}... ", index, step.dimmed());
                    pb.set_message(body.clone());
                    pb.enable_steady_tick(StdDuration::from_millis(100));

                    spinner = Some(pb);
                    step_text = body;
                }

                TestEvent::StepPassed { duration_ms, .. } => {
                    let done_msg =
                        format!("    {} {}({}ms)", "✓".green(), step_text, duration_ms);
                    if let Some(pb) = spinner.take() {
                        pb.finish_and_clear();
                        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
                    }
                    println!("{}", done_msg);
                }

                TestEvent::StepFailed {
                    error, duration_ms, ..
                } => {
                    let done_msg =
                        format!("    {} {}({}ms)", "✗".red(), step_text, duration_ms);
                    if let Some(pb) = spinner.take() {
                        pb.finish_and_clear();
                        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
                    }
                    println!("{}", done_msg);
                    println!("      {}", error.red());
                }

                TestEvent::StepSkipped { index, reason } => {
                    println!(
                        "    {} [{}] skipped ({})",
                        "○".yellow(),
                        index,
                        reason.dimmed()
                    );
                }

                TestEvent::Log { message } => {
                    multi.println(format!("      {}", message)).ok();
                }
            }
        }
    }
}
