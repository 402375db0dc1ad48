use std::{
    path::{Path, PathBuf},
    sync::Mutex,
};

use rand::{distributions::Alphanumeric, Rng};

use crate::report::{ProgressEvent, Reporter};

/// A fresh, not-yet-created directory under the system temp dir.
pub fn scratch_dir() -> PathBuf {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(12)
        .map(char::from)
        .collect();
    std::env::temp_dir().join(format!("cpst-test-{}", suffix))
}

/// Writes a shell script meant to be started through `/bin/sh`.
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fsutil::write_with_mkdir(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    path
}

/// Reporter double that keeps everything it was told.
#[derive(Default)]
pub struct RecordingReporter {
    pub events: Mutex<Vec<ProgressEvent>>,
    pub errors: Mutex<Vec<String>>,
    pub cleared: Mutex<usize>,
    pub started: Mutex<usize>,
}

impl RecordingReporter {
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }
}

impl Reporter for RecordingReporter {
    fn report_progress(&self, event: &ProgressEvent) {
        self.events.lock().unwrap().push(event.clone());
    }

    fn report_error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_owned());
    }

    fn report_history_cleared(&self) {
        *self.cleared.lock().unwrap() += 1;
    }

    fn report_run_started(&self) {
        *self.started.lock().unwrap() += 1;
    }
}
