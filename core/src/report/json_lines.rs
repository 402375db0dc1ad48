use std::{
    io::{self, Write},
    sync::Mutex,
};

use serde::Serialize;

use super::{ProgressEvent, Reporter};

/// Machine-facing sink: one JSON object per line, for editor integrations.
pub struct JsonLinesReporter<W> {
    out: Mutex<W>,
}

#[derive(Serialize)]
#[serde(tag = "event")]
enum Notice<'a> {
    Error { message: &'a str },
    HistoryCleared,
    RunStarted,
}

impl JsonLinesReporter<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> JsonLinesReporter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        match self.out.into_inner() {
            Ok(w) => w,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn emit<T: Serialize>(&self, value: &T) {
        let Ok(mut out) = self.out.lock() else {
            return
        };
        let res = serde_json::to_writer(&mut *out, value)
            .map_err(io::Error::from)
            .and_then(|_| writeln!(out))
            .and_then(|_| out.flush());
        if let Err(e) = res {
            log::warn!("Failed to write event: {}", e);
        }
    }
}

impl<W: Write + Send> Reporter for JsonLinesReporter<W> {
    fn report_progress(&self, event: &ProgressEvent) {
        self.emit(event)
    }

    fn report_error(&self, message: &str) {
        self.emit(&Notice::Error { message })
    }

    fn report_history_cleared(&self) {
        self.emit(&Notice::HistoryCleared)
    }

    fn report_run_started(&self) {
        self.emit(&Notice::RunStarted)
    }
}
