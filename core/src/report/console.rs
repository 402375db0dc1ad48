use std::{sync::Mutex, time::Duration};

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use super::{ProgressEvent, Reporter};
use crate::style;
use crate::testing::CaseStatus;

/// Human-facing sink: one spinner per case, failing cases dumped in full.
pub struct ConsoleReporter {
    spinner: Mutex<Option<ProgressBar>>,
    show_failure_detail: bool,
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self {
            spinner: Mutex::new(None),
            show_failure_detail: true,
        }
    }
}

impl ConsoleReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show_failure_detail(mut self, yes: bool) -> Self {
        self.show_failure_detail = yes;
        self
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    fn take_spinner(&self) -> Option<ProgressBar> {
        self.spinner.lock().ok().and_then(|mut s| s.take())
    }
}

impl Reporter for ConsoleReporter {
    fn report_progress(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::Running { run_id, test_case } => {
                let prefix = run_id.as_ref().map(|id| format!("{} ", id)).unwrap_or_default();
                let bar = ProgressBar::new_spinner()
                    .with_style(Self::spinner_style())
                    .with_message(format!("{}Case {} ...", prefix, test_case));
                bar.enable_steady_tick(Duration::from_millis(80));
                if let Ok(mut slot) = self.spinner.lock() {
                    if let Some(old) = slot.replace(bar) {
                        old.finish_and_clear();
                    }
                }
            }
            ProgressEvent::Finished { run_id, verdict } => {
                let line = style::case_line(verdict, run_id.as_ref().map(|id| id.as_str()));
                match self.take_spinner() {
                    Some(bar) => bar.finish_with_message(line),
                    None => println!("  {}", line),
                }
                if self.show_failure_detail && verdict.status != CaseStatus::OK {
                    style::print_case_detail(verdict);
                }
            }
            ProgressEvent::Summary { summary } => {
                if let Some(bar) = self.take_spinner() {
                    bar.finish_and_clear();
                }
                println!();
                style::print_summary(summary);
            }
        }
    }

    fn report_error(&self, message: &str) {
        if let Some(bar) = self.take_spinner() {
            bar.finish_and_clear();
        }
        eprintln!("{} {}", "[Error]".bright_red().bold(), message);
    }

    fn report_history_cleared(&self) {
        println!("{}", "History cleared".dimmed());
    }

    fn report_run_started(&self) {
        println!("{}", "Run started".cyan().bold());
    }
}
