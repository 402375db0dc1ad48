use std::{collections::BTreeMap, time::Duration};

use serde::{Deserialize, Serialize};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum CaseStatus {
    OK,
    WA,
    TLE,
    MLE,
    #[serde(rename = "RUNTIME_ERROR")]
    #[strum(to_string = "RUNTIME_ERROR", serialize = "RE")]
    RE,
    /// The case could not be judged: generator or checker misbehaved.
    Error,
}

/// What the test runner observed for a single case, before it gets a case number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseOutcome {
    pub status: CaseStatus,
    pub input: Option<String>,
    pub output: Option<String>,
    pub execution_time: Option<Duration>,
    pub memory_kb: Option<u64>,
    pub message: Option<String>,
    pub reason: Option<String>,
}

impl CaseOutcome {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: CaseStatus::Error,
            input: None,
            output: None,
            execution_time: None,
            memory_kb: None,
            message: Some(message.into()),
            reason: None,
        }
    }
}

/// One executed case as persisted in `test_<n>.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseVerdict {
    #[serde(rename = "testCase")]
    pub case_no: u32,

    #[serde(rename = "lastResult")]
    pub status: CaseStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,

    #[serde(rename = "userOutput", default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    #[serde(rename = "execTime", default, skip_serializing_if = "Option::is_none")]
    pub exec_time_ms: Option<u64>,

    #[serde(rename = "memoryUsed", default, skip_serializing_if = "Option::is_none")]
    pub memory_kb: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl CaseVerdict {
    pub fn new(case_no: u32, outcome: CaseOutcome) -> Self {
        let CaseOutcome {
            status,
            input,
            output,
            execution_time,
            memory_kb,
            message,
            reason,
        } = outcome;
        Self {
            case_no,
            status,
            input,
            output,
            exec_time_ms: execution_time.map(|d| d.as_millis() as u64),
            memory_kb,
            message,
            reason,
        }
    }
}

/// Per-session count of case statuses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Histogram(BTreeMap<CaseStatus, usize>);

impl Histogram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, status: CaseStatus) {
        *self.0.entry(status).or_default() += 1;
    }

    pub fn get(&self, status: CaseStatus) -> usize {
        self.0.get(&status).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.0.values().sum()
    }

    pub fn is_all_ok(&self) -> bool {
        self.get(CaseStatus::OK) == self.total()
    }

    pub fn iter(&self) -> impl Iterator<Item = (CaseStatus, usize)> + '_ {
        self.0.iter().map(|(&status, &count)| (status, count))
    }
}

impl FromIterator<CaseStatus> for Histogram {
    fn from_iter<I: IntoIterator<Item = CaseStatus>>(iter: I) -> Self {
        let mut h = Self::new();
        iter.into_iter().for_each(|s| h.record(s));
        h
    }
}
