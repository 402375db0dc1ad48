use std::path::PathBuf;

use cpst_core::{action, interactive, print_success, report::ConsoleReporter, storage::RunId};

use crate::util;

use super::{GlobalArgs, SubcmdResult};

#[derive(Debug, clap::Args)]
pub struct Args {
    #[command(subcommand)]
    pub target: Target,

    /// Do not ask for confirmation
    #[arg(short, long, global = true)]
    pub yes: bool,
}

#[derive(Debug, clap::Subcommand)]
pub enum Target {
    /// Every run of a solution
    Solution { solution: PathBuf },

    Run { run_id: RunId },

    Case {
        run_id: RunId,
        #[arg(value_name = "N")]
        case_no: u32,
    },
}

impl Target {
    fn describe(&self) -> String {
        match self {
            Target::Solution { solution } => {
                format!("all results of {}", util::solution_name(solution))
            }
            Target::Run { run_id } => format!("run {}", run_id),
            Target::Case { run_id, case_no } => format!("case {} of run {}", case_no, run_id),
        }
    }
}

pub fn exec(args: &Args, global_args: &GlobalArgs) -> SubcmdResult {
    let cfg = global_args.load_config()?;
    let store = global_args.store(&cfg);
    let reporter = ConsoleReporter::new();

    let what = args.target.describe();
    if !args.yes && !interactive::ask_confirm(&format!("Delete {}?", what))? {
        return Ok(());
    }

    match &args.target {
        Target::Solution { solution } => {
            action::delete_solution(&store, &reporter, &util::solution_name(solution))?
        }
        Target::Run { run_id } => action::delete_run(&store, &reporter, run_id)?,
        Target::Case { run_id, case_no } => {
            action::delete_case(&store, &reporter, run_id, *case_no)?
        }
    }
    print_success!("Deleted {}", what);
    Ok(())
}
