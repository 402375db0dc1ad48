use std::path::PathBuf;

use cpst_core::{
    action::{self, CaseFilter, Toolchain},
    orchestrator::SessionOutcome,
    scaffold::{self, ProgramFiles},
    storage::RunId,
};

use crate::util;

use super::{GlobalArgs, SubcmdResult};

#[derive(Debug, clap::Args)]
pub struct Args {
    pub solution: PathBuf,

    /// Runs to replay [default: the latest run]
    pub run_ids: Vec<RunId>,

    /// Only this case number (repeatable)
    #[arg(long = "case", value_name = "N")]
    pub cases: Vec<u32>,

    /// Only cases that did not pass
    #[arg(long)]
    pub failed: bool,

    #[arg(short = 'c', long)]
    pub checker: Option<PathBuf>,

    /// Time limit per case in milliseconds
    #[arg(long, value_name = "MS")]
    pub time_limit: Option<u64>,

    /// Emit progress as JSON lines
    #[arg(long)]
    pub json: bool,

    /// Do not dump input and output of failing cases
    #[arg(long)]
    pub no_detail: bool,
}

pub async fn exec(args: &Args, global_args: &GlobalArgs) -> SubcmdResult {
    let cfg = global_args.load_config()?;
    let store = global_args.store(&cfg);
    let reporter = super::reporter(args.json, !args.no_detail);

    let solution = scaffold::solution_for(&args.solution).unwrap_or_else(|| args.solution.clone());
    let files = ProgramFiles::for_solution(&solution);
    let checker = args.checker.clone().unwrap_or(files.checker);

    let filter = CaseFilter {
        case_numbers: args.cases.clone(),
        failed_only: args.failed,
    };
    let selection =
        action::select_cases(&store, &util::solution_name(&solution), &args.run_ids, &filter)?;

    let mut limits = cfg.exec_limits();
    if let Some(ms) = args.time_limit {
        limits.timeout = std::time::Duration::from_millis(ms);
    }
    let toolchain = Toolchain::from_config(&cfg, reporter.clone())?.limits(limits);

    let outcome =
        action::rerun(&toolchain, &store, &*reporter, &solution, &checker, &selection).await?;
    if let SessionOutcome::CompileFailed { .. } = outcome {
        std::process::exit(1);
    }
    Ok(())
}
