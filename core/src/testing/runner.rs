use std::path::Path;

use super::{
    executor::{ExecLimits, ExecOutput, ExecStatus, Executor},
    result::{CaseOutcome, CaseStatus},
};

/// Scratch files handed to the checker, reused by every case.
pub const INPUT_FILENAME: &str = "input.txt";
pub const OUTPUT_FILENAME: &str = "output.txt";

const CHECKER_ACCEPT: i32 = 0;
const CHECKER_REJECT: i32 = 1;

/// Runs one case through generator -> solution -> checker.
#[derive(Debug, Clone)]
pub struct TestRunner<'e, E: ?Sized> {
    executor: &'e E,
    limits: ExecLimits,
}

impl<'e, E> TestRunner<'e, E>
where
    E: Executor + ?Sized,
{
    pub fn new(executor: &'e E) -> Self {
        Self {
            executor,
            limits: ExecLimits::default(),
        }
    }

    pub fn limits(mut self, limits: ExecLimits) -> Self {
        self.limits = limits;
        self
    }

    pub async fn run(
        &self,
        temp_dir: &Path,
        solution: &Path,
        generator: &Path,
        checker: &Path,
    ) -> CaseOutcome {
        let generated = self.executor.run_with_limits(generator, "", &self.limits).await;
        if !generated.stderr.is_empty() {
            return CaseOutcome::error(format!("Generator error: {}", generated.stderr));
        }
        if generated.status != ExecStatus::OK {
            return CaseOutcome::error(format!(
                "Generator error: generator finished with {}",
                CaseStatus::from(generated.status)
            ));
        }
        self.run_with_input(temp_dir, solution, checker, &generated.stdout)
            .await
    }

    /// Replays `input` against the solution, skipping generation.
    pub async fn run_with_input(
        &self,
        temp_dir: &Path,
        solution: &Path,
        checker: &Path,
        input: &str,
    ) -> CaseOutcome {
        let sol = self
            .executor
            .run_with_limits(solution, input, &self.limits)
            .await;

        if sol.status != ExecStatus::OK {
            let message = (sol.status == ExecStatus::RE && !sol.stderr.is_empty())
                .then(|| format!("Solution runtime error: {}", sol.stderr));
            return CaseOutcome {
                message,
                ..Self::outcome(sol.status.into(), input, None, &sol)
            };
        }

        // Stray diagnostics disqualify the run even with exit code 0.
        if !sol.stderr.is_empty() {
            return CaseOutcome {
                message: Some(format!("Solution runtime error: {}", sol.stderr)),
                ..Self::outcome(CaseStatus::RE, input, None, &sol)
            };
        }

        let input_file = temp_dir.join(INPUT_FILENAME);
        let output_file = temp_dir.join(OUTPUT_FILENAME);
        let prepared = fsutil::write(&input_file, input)
            .and_then(|_| fsutil::write(&output_file, &sol.stdout));
        if let Err(e) = prepared {
            return CaseOutcome {
                message: Some(format!("Checker error: {}", e)),
                ..Self::outcome(CaseStatus::Error, input, Some(&sol.stdout), &sol)
            };
        }

        let chk = self
            .executor
            .run_raw(checker, &[input_file.as_os_str(), output_file.as_os_str()])
            .await;

        match (chk.spawn_error, chk.exit_code) {
            (None, Some(CHECKER_ACCEPT)) => {
                Self::outcome(CaseStatus::OK, input, Some(&sol.stdout), &sol)
            }
            (None, Some(CHECKER_REJECT)) => CaseOutcome {
                reason: Some(chk.stderr),
                ..Self::outcome(CaseStatus::WA, input, Some(&sol.stdout), &sol)
            },
            (spawn_error, _) => CaseOutcome {
                message: Some(format!(
                    "Checker error: {}",
                    spawn_error.unwrap_or(chk.stderr)
                )),
                ..Self::outcome(CaseStatus::Error, input, Some(&sol.stdout), &sol)
            },
        }
    }

    fn outcome(
        status: CaseStatus,
        input: &str,
        output: Option<&str>,
        sol: &ExecOutput,
    ) -> CaseOutcome {
        CaseOutcome {
            status,
            input: Some(input.to_owned()),
            output: output.map(str::to_owned),
            execution_time: Some(sol.duration),
            memory_kb: Some(sol.memory_kb),
            message: None,
            reason: None,
        }
    }
}
