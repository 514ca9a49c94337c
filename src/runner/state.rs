use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Step execution status
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Running,
    Passed,
    Failed { error: String },
    Skipped { reason: String },
}

impl StepStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StepStatus::Passed | StepStatus::Failed { .. } | StepStatus::Skipped { .. }
        )
    }
}

/// State for a single step execution
#[derive(Debug, Clone)]
pub struct StepState {
    pub index: usize,
    pub step_display: String,
    pub status: StepStatus,
    pub started_at: Option<Instant>,
    pub finished_at: Option<Instant>,
    pub duration_ms: Option<u64>,
    pub screenshot_path: Option<String>,
}

impl StepState {
    pub fn new(index: usize, display: &str) -> Self {
        Self {
            index,
            step_display: display.to_string(),
            status: StepStatus::Pending,
            started_at: None,
            finished_at: None,
            duration_ms: None,
            screenshot_path: None,
        }
    }

    pub fn start(&mut self) {
        self.status = StepStatus::Running;
        self.started_at = Some(Instant::now());
    }

    pub fn pass(&mut self) {
        self.finish(StepStatus::Passed);
    }

    pub fn fail(&mut self, error: String) {
        self.finish(StepStatus::Failed { error });
    }

    pub fn skip(&mut self, reason: String) {
        self.status = StepStatus::Skipped { reason };
    }

    fn finish(&mut self, status: StepStatus) {
        self.status = status;
        self.finished_at = Some(Instant::now());
        if let Some(start) = self.started_at {
            self.duration_ms = Some(start.elapsed().as_millis() as u64);
        }
    }

    /// Serialize state for reporting (without Instant which isn't serializable)
    pub fn to_report(&self) -> StepStateReport {
        StepStateReport {
            index: self.index,
            step_display: self.step_display.clone(),
            status: self.status.clone(),
            duration_ms: self.duration_ms,
            screenshot_path: self.screenshot_path.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepStateReport {
    pub index: usize,
    pub step_display: String,
    pub status: StepStatus,
    pub duration_ms: Option<u64>,
    pub screenshot_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CaseStatus {
    Pending,
    Running,
    Passed,
    Failed,
    PartiallyPassed { passed: u32, failed: u32 },
}

/// State for a whole test case
#[derive(Debug, Clone)]
pub struct CaseState {
    pub case_name: String,
    pub suite_path: String,
    pub status: CaseStatus,
    pub steps: Vec<StepState>,
    pub current_index: usize,
    pub started_at: Option<Instant>,
    pub finished_at: Option<Instant>,
    pub total_duration_ms: Option<u64>,
    pub error: Option<String>,
}

impl CaseState {
    pub fn new(name: &str, path: &str, steps: Vec<StepState>) -> Self {
        Self {
            case_name: name.to_string(),
            suite_path: path.to_string(),
            status: CaseStatus::Pending,
            steps,
            current_index: 0,
            started_at: None,
            finished_at: None,
            total_duration_ms: None,
            error: None,
        }
    }

    pub fn start(&mut self) {
        self.status = CaseStatus::Running;
        self.started_at = Some(Instant::now());
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Instant::now());
        if let Some(start) = self.started_at {
            self.total_duration_ms = Some(start.elapsed().as_millis() as u64);
        }

        let (passed, failed) = self
            .steps
            .iter()
            .fold((0, 0), |(p, f), step| match step.status {
                StepStatus::Passed => (p + 1, f),
                StepStatus::Failed { .. } => (p, f + 1),
                _ => (p, f),
            });

        self.status = if failed == 0 {
            CaseStatus::Passed
        } else if passed == 0 {
            CaseStatus::Failed
        } else {
            CaseStatus::PartiallyPassed { passed, failed }
        };
    }

    pub fn skip_remaining(&mut self, reason: &str) {
        for step in &mut self.steps[self.current_index..] {
            if matches!(step.status, StepStatus::Pending) {
                step.skip(reason.to_string());
            }
        }
    }

    pub fn to_report(&self) -> CaseStateReport {
        CaseStateReport {
            case_name: self.case_name.clone(),
            suite_path: self.suite_path.clone(),
            status: self.status.clone(),
            steps: self.steps.iter().map(|s| s.to_report()).collect(),
            total_duration_ms: self.total_duration_ms,
            error: self.error.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseStateReport {
    pub case_name: String,
    pub suite_path: String,
    pub status: CaseStatus,
    pub steps: Vec<StepStateReport>,
    pub total_duration_ms: Option<u64>,
    pub error: Option<String>,
}

/// Global session state across all suite files of a run
#[derive(Debug, Clone)]
pub struct SessionState {
    pub session_id: String,
    pub cases: Vec<CaseState>,
    pub started_at: Option<Instant>,
    pub finished_at: Option<Instant>,
}

impl SessionState {
    pub fn new(session_id: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            cases: Vec::new(),
            started_at: None,
            finished_at: None,
        }
    }

    pub fn start(&mut self) {
        self.started_at = Some(Instant::now());
    }

    pub fn add_case(&mut self, case: CaseState) {
        self.cases.push(case);
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Instant::now());
    }

    pub fn summary(&self) -> RunSummary {
        let mut total_steps = 0;
        let mut passed = 0;
        let mut failed = 0;
        let mut skipped = 0;

        for case in &self.cases {
            for step in &case.steps {
                total_steps += 1;
                match step.status {
                    StepStatus::Passed => passed += 1,
                    StepStatus::Failed { .. } => failed += 1,
                    StepStatus::Skipped { .. } => skipped += 1,
                    _ => {}
                }
            }
        }

        let total_duration_ms = self.started_at.map(|start| {
            self.finished_at
                .unwrap_or_else(Instant::now)
                .duration_since(start)
                .as_millis() as u64
        });

        RunSummary {
            session_id: self.session_id.clone(),
            total_cases: self.cases.len() as u32,
            total_steps,
            passed,
            failed,
            skipped,
            total_duration_ms,
        }
    }

    pub fn to_report(&self) -> SessionReport {
        SessionReport {
            session_id: self.session_id.clone(),
            cases: self.cases.iter().map(|c| c.to_report()).collect(),
            summary: self.summary(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub session_id: String,
    pub total_cases: u32,
    pub total_steps: u32,
    pub passed: u32,
    pub failed: u32,
    pub skipped: u32,
    pub total_duration_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionReport {
    pub session_id: String,
    pub cases: Vec<CaseStateReport>,
    pub summary: RunSummary,
}
