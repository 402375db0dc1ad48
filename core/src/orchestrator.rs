use std::{collections::BTreeMap, path::Path};

use crate::action::error::*;
use crate::compile::{self, Compiler};
use crate::report::{ProgressEvent, Reporter};
use crate::storage::{ResultStore, RunId, SessionPaths};
use crate::testing::{CaseVerdict, ExecLimits, Executor, Histogram, TestRunner};

/// Previously stored cases to replay, grouped by the run they belong to.
pub type RerunSelection = BTreeMap<RunId, Vec<CaseVerdict>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// A program did not compile; no case was run.
    CompileFailed { run_id: Option<RunId> },
    Completed {
        run_id: Option<RunId>,
        histogram: Histogram,
    },
}

impl SessionOutcome {
    pub fn run_id(&self) -> Option<&RunId> {
        match self {
            Self::CompileFailed { run_id } | Self::Completed { run_id, .. } => run_id.as_ref(),
        }
    }

    pub fn histogram(&self) -> Option<&Histogram> {
        match self {
            Self::CompileFailed { .. } => None,
            Self::Completed { histogram, .. } => Some(histogram),
        }
    }
}

/// Drives stress sessions: compile once, then run cases one after another.
pub struct Orchestrator<'a> {
    store: &'a ResultStore,
    compiler: &'a dyn Compiler,
    executor: &'a dyn Executor,
    reporter: &'a dyn Reporter,
    limits: ExecLimits,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        store: &'a ResultStore,
        compiler: &'a dyn Compiler,
        executor: &'a dyn Executor,
        reporter: &'a dyn Reporter,
    ) -> Self {
        Self {
            store,
            compiler,
            executor,
            reporter,
            limits: ExecLimits::default(),
        }
    }

    pub fn limits(mut self, limits: ExecLimits) -> Self {
        self.limits = limits;
        self
    }

    fn runner(&self) -> TestRunner<'_, dyn Executor + 'a> {
        TestRunner::new(self.executor).limits(self.limits)
    }

    /// Runs `num_tests` freshly generated cases against `solution` in a new run.
    pub async fn run(
        &self,
        solution: &Path,
        generator: &Path,
        checker: &Path,
        num_tests: u32,
    ) -> Result<SessionOutcome> {
        let paths = self.store.setup(solution).context("Failed to prepare result store")?;
        let res = self.run_in(&paths, solution, generator, checker, num_tests).await;
        self.store.cleanup(&[&paths.temp_dir]);
        res
    }

    async fn run_in(
        &self,
        paths: &SessionPaths,
        solution: &Path,
        generator: &Path,
        checker: &Path,
        num_tests: u32,
    ) -> Result<SessionOutcome> {
        self.store
            .initialize_run(&paths.solution_name, &paths.run_id)
            .context("Failed to register run")?;
        log::info!("Run {} of {}", paths.run_id, paths.solution_name);
        self.reporter.report_run_started();

        let run_id = Some(paths.run_id.clone());
        let Some(exes) = compile::compile_all(
            self.compiler,
            &paths.temp_dir,
            solution,
            Some(generator),
            checker,
        )
        .await
        else {
            return Ok(SessionOutcome::CompileFailed { run_id });
        };
        let Some(generator_exe) = &exes.generator else {
            bail!("Generator was not compiled")
        };

        let runner = self.runner();
        let mut histogram = Histogram::new();
        for case_no in 1..=num_tests {
            self.reporter.report_progress(&ProgressEvent::Running {
                run_id: None,
                test_case: case_no,
            });
            let outcome = runner
                .run(&paths.temp_dir, &exes.solution, generator_exe, &exes.checker)
                .await;
            let verdict = CaseVerdict::new(case_no, outcome);
            histogram.record(verdict.status);

            self.store
                .save_result(&paths.run_dir, &verdict)
                .with_context(|| format!("Failed to save result of case {}", case_no))?;
            self.reporter
                .report_progress(&ProgressEvent::Finished { run_id: None, verdict });
        }

        self.reporter.report_progress(&ProgressEvent::Summary {
            summary: histogram.clone(),
        });
        Ok(SessionOutcome::Completed { run_id, histogram })
    }

    /// Replays stored inputs of the selected cases and overwrites their results in place.
    pub async fn rerun(
        &self,
        solution: &Path,
        checker: &Path,
        selection: &RerunSelection,
    ) -> Result<SessionOutcome> {
        let temp_dir = self.store.temp_dir();
        fsutil::mkdir_all(&temp_dir).context("Failed to prepare result store")?;
        let res = self.rerun_in(&temp_dir, solution, checker, selection).await;
        self.store.cleanup(&[&temp_dir]);
        res
    }

    async fn rerun_in(
        &self,
        temp_dir: &Path,
        solution: &Path,
        checker: &Path,
        selection: &RerunSelection,
    ) -> Result<SessionOutcome> {
        self.reporter.report_run_started();

        let Some(exes) = compile::compile_all(self.compiler, temp_dir, solution, None, checker).await
        else {
            return Ok(SessionOutcome::CompileFailed { run_id: None });
        };

        let runner = self.runner();
        let mut histogram = Histogram::new();
        for (run_id, cases) in selection {
            for case in cases {
                let Some(input) = &case.input else {
                    self.reporter.report_error(&format!(
                        "Case {} of run {} has no stored input, skipped",
                        case.case_no, run_id
                    ));
                    continue;
                };
                self.reporter.report_progress(&ProgressEvent::Running {
                    run_id: Some(run_id.clone()),
                    test_case: case.case_no,
                });
                let outcome = runner
                    .run_with_input(temp_dir, &exes.solution, &exes.checker, input)
                    .await;
                let verdict = CaseVerdict::new(case.case_no, outcome);
                histogram.record(verdict.status);

                self.store.update_result(run_id, &verdict).with_context(|| {
                    format!("Failed to update case {} of run {}", case.case_no, run_id)
                })?;
                self.reporter.report_progress(&ProgressEvent::Finished {
                    run_id: Some(run_id.clone()),
                    verdict,
                });
            }
        }

        self.reporter.report_progress(&ProgressEvent::Summary {
            summary: histogram.clone(),
        });
        Ok(SessionOutcome::Completed {
            run_id: None,
            histogram,
        })
    }
}
