use crate::runner::state::{CaseStateReport, RunSummary};
use serde::{Deserialize, Serialize};

/// Test results for report generation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResults {
    pub session_id: String,
    pub cases: Vec<CaseStateReport>,
    pub summary: RunSummary,
    pub generated_at: String,
}
