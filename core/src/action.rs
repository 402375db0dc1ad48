pub mod error {
    #[allow(unused_imports)]
    pub(crate) use anyhow::{anyhow, bail, ensure, Context as _};
    pub use anyhow::{Error, Result};
}
use std::path::{Path, PathBuf};
use std::sync::Arc;

use error::*;

use crate::compile::{CompileCommand, ToolchainCompiler};
use crate::config::Config;
use crate::orchestrator::{Orchestrator, RerunSelection, SessionOutcome};
use crate::report::Reporter;
use crate::scaffold::{self, Materialized, ProgramFiles};
use crate::storage::{ResultStore, RunId, SolutionName};
use crate::testing::{CaseStatus, CaseVerdict, ExecLimits, Histogram, ProcessExecutor};

/// Writes the example `cpst.toml` into `dir`.
pub fn init_config(dir: impl AsRef<Path>) -> Result<PathBuf> {
    let path = dir.as_ref().join(Config::FILENAME);
    ensure!(!path.exists(), "Already exists: {}", path.to_string_lossy());
    fsutil::write_with_mkdir(&path, Config::example_toml())
        .context("Failed to write example config")?;
    Ok(path)
}

pub fn scaffold(solution: impl AsRef<Path>, force: bool) -> Result<Vec<(PathBuf, Materialized)>> {
    scaffold::materialize(solution, force).context("Failed to create generator/checker stubs")
}

/// Fails with a hint when any of the programs is missing.
pub fn ensure_program_files(files: &ProgramFiles) -> Result<()> {
    let missing = files.missing();
    if missing.is_empty() {
        return Ok(());
    }
    let list = missing
        .iter()
        .map(|p| format!("  {}", p.to_string_lossy()))
        .collect::<Vec<_>>()
        .join("\n");
    bail!(
        "Missing program files:\n{}\nHint: `cpst new {}` creates generator and checker stubs",
        list,
        files.solution.to_string_lossy()
    )
}

/// Compiler and executor built from the configuration.
pub struct Toolchain {
    compiler: ToolchainCompiler,
    executor: ProcessExecutor,
    limits: ExecLimits,
}

impl Toolchain {
    pub fn from_config(cfg: &Config, reporter: Arc<dyn Reporter>) -> Result<Self> {
        let command = CompileCommand::parse(cfg.compile.command.clone())
            .context("Invalid `compile.command` in config")?;
        let executor = match &cfg.execution.launcher {
            Some(launcher) => ProcessExecutor::new().launcher(launcher),
            None => ProcessExecutor::new(),
        };
        Ok(Self {
            compiler: ToolchainCompiler::new(command, reporter),
            executor,
            limits: cfg.exec_limits(),
        })
    }

    pub fn limits(mut self, limits: ExecLimits) -> Self {
        self.limits = limits;
        self
    }

    fn orchestrator<'a>(
        &'a self,
        store: &'a ResultStore,
        reporter: &'a dyn Reporter,
    ) -> Orchestrator<'a> {
        Orchestrator::new(store, &self.compiler, &self.executor, reporter).limits(self.limits)
    }
}

pub async fn stress(
    toolchain: &Toolchain,
    store: &ResultStore,
    reporter: &dyn Reporter,
    files: &ProgramFiles,
    num_tests: u32,
) -> Result<SessionOutcome> {
    self::ensure_program_files(files)?;
    toolchain
        .orchestrator(store, reporter)
        .run(&files.solution, &files.generator, &files.checker, num_tests)
        .await
}

pub async fn rerun(
    toolchain: &Toolchain,
    store: &ResultStore,
    reporter: &dyn Reporter,
    solution: &Path,
    checker: &Path,
    selection: &RerunSelection,
) -> Result<SessionOutcome> {
    for p in [solution, checker] {
        ensure!(p.is_file(), "No such file: {}", p.to_string_lossy());
    }
    toolchain
        .orchestrator(store, reporter)
        .rerun(solution, checker, selection)
        .await
}

/// Which stored cases `rerun` should replay.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaseFilter {
    /// Empty means every case.
    pub case_numbers: Vec<u32>,
    pub failed_only: bool,
}

impl CaseFilter {
    fn accepts(&self, v: &CaseVerdict) -> bool {
        (self.case_numbers.is_empty() || self.case_numbers.contains(&v.case_no))
            && (!self.failed_only || v.status != CaseStatus::OK)
    }
}

/// Collects stored cases of `run_ids` (default: the latest run of `solution`).
pub fn select_cases(
    store: &ResultStore,
    solution: &SolutionName,
    run_ids: &[RunId],
    filter: &CaseFilter,
) -> Result<RerunSelection> {
    let run_ids = if run_ids.is_empty() {
        let latest = store
            .list_runs(solution)
            .pop()
            .with_context(|| format!("No run recorded for {}", solution))?;
        vec![latest]
    } else {
        run_ids.to_vec()
    };

    let selection: RerunSelection = run_ids
        .into_iter()
        .map(|id| {
            let cases = store
                .list_results(&id)
                .into_iter()
                .filter(|v| filter.accepts(v))
                .collect::<Vec<_>>();
            (id, cases)
        })
        .filter(|(_, cases)| !cases.is_empty())
        .collect();

    ensure!(!selection.is_empty(), "No stored case matches the selection");
    Ok(selection)
}

/// Runs of `solution` with their status counts, oldest first.
pub fn run_summaries(store: &ResultStore, solution: &SolutionName) -> Vec<(RunId, Histogram)> {
    store
        .list_runs(solution)
        .into_iter()
        .map(|id| {
            let hist = store.list_results(&id).iter().map(|v| v.status).collect();
            (id, hist)
        })
        .collect()
}

pub fn show_case(store: &ResultStore, run_id: &RunId, case_no: u32) -> Result<CaseVerdict> {
    store
        .read_result(run_id, case_no)
        .with_context(|| format!("No case {} in run {}", case_no, run_id))
}

pub fn delete_solution(store: &ResultStore, reporter: &dyn Reporter, name: &SolutionName) -> Result<()> {
    let deleted = store
        .delete_solution(name)
        .with_context(|| format!("Failed to delete results of {}", name))?;
    ensure!(deleted, "Unknown solution: {}", name);
    reporter.report_history_cleared();
    Ok(())
}

pub fn delete_run(store: &ResultStore, reporter: &dyn Reporter, run_id: &RunId) -> Result<()> {
    let deleted = store
        .delete_run(run_id)
        .with_context(|| format!("Failed to delete run {}", run_id))?;
    ensure!(deleted, "Unknown run: {}", run_id);
    reporter.report_history_cleared();
    Ok(())
}

pub fn delete_case(
    store: &ResultStore,
    reporter: &dyn Reporter,
    run_id: &RunId,
    case_no: u32,
) -> Result<()> {
    let deleted = store
        .delete_result(run_id, case_no)
        .with_context(|| format!("Failed to delete case {} of run {}", case_no, run_id))?;
    ensure!(deleted, "No case {} in run {}", case_no, run_id);
    reporter.report_history_cleared();
    Ok(())
}
