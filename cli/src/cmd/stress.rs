use std::path::PathBuf;
use std::time::Duration;

use cpst_core::{
    action::{self, Toolchain},
    orchestrator::SessionOutcome,
    scaffold::{self, ProgramFiles},
};

use super::{GlobalArgs, SubcmdResult};

#[derive(Debug, clap::Args)]
pub struct Args {
    /// Solution source (its generator or checker is accepted too)
    pub solution: PathBuf,

    /// Number of cases [default: `stress.num_tests`]
    #[arg(short = 'n', long)]
    pub num_tests: Option<u32>,

    #[arg(short = 'g', long)]
    pub generator: Option<PathBuf>,

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
    let mut files = ProgramFiles::for_solution(solution);
    if let Some(g) = &args.generator {
        files.generator = g.clone();
    }
    if let Some(c) = &args.checker {
        files.checker = c.clone();
    }

    let mut limits = cfg.exec_limits();
    if let Some(ms) = args.time_limit {
        limits.timeout = Duration::from_millis(ms);
    }
    let toolchain = Toolchain::from_config(&cfg, reporter.clone())?.limits(limits);
    let num_tests = args.num_tests.unwrap_or(cfg.stress.num_tests);

    let outcome = action::stress(&toolchain, &store, &*reporter, &files, num_tests).await?;
    if let SessionOutcome::CompileFailed { .. } = outcome {
        std::process::exit(1);
    }
    Ok(())
}
