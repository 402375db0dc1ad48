use serde::{Deserialize, Serialize};

use crate::storage::RunId;
use crate::testing::{CaseVerdict, Histogram};

pub mod console;
pub mod json_lines;

pub use console::ConsoleReporter;
pub use json_lines::JsonLinesReporter;

/// Progress pushed by a session. `run_id` is set only when replaying cases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum ProgressEvent {
    Running {
        #[serde(rename = "runId", default, skip_serializing_if = "Option::is_none")]
        run_id: Option<RunId>,
        #[serde(rename = "testCase")]
        test_case: u32,
    },
    Finished {
        #[serde(rename = "runId", default, skip_serializing_if = "Option::is_none")]
        run_id: Option<RunId>,
        #[serde(flatten)]
        verdict: CaseVerdict,
    },
    Summary {
        summary: Histogram,
    },
}

/// Where sessions send everything a user should see.
pub trait Reporter: Send + Sync {
    fn report_progress(&self, event: &ProgressEvent);

    fn report_error(&self, message: &str);

    fn report_history_cleared(&self);

    fn report_run_started(&self);
}
