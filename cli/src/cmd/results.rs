use std::path::PathBuf;

use anyhow::ensure;
use colored::Colorize;
use cpst_core::{action, storage::RunId, style};

use crate::util;

use super::{GlobalArgs, SubcmdResult};

#[derive(Debug, clap::Args)]
pub struct Args {
    /// Lists the runs of this solution
    pub solution: Option<PathBuf>,

    /// Lists the cases of this run
    pub run_id: Option<RunId>,
}

pub fn exec(args: &Args, global_args: &GlobalArgs) -> SubcmdResult {
    let cfg = global_args.load_config()?;
    let store = global_args.store(&cfg);

    let Some(solution) = &args.solution else {
        for name in store.list_solutions() {
            println!("{}", name);
        }
        return Ok(());
    };

    let name = util::solution_name(solution);
    let Some(run_id) = &args.run_id else {
        let summaries = action::run_summaries(&store, &name);
        ensure!(!summaries.is_empty(), "No run recorded for {}", name);
        for (id, hist) in summaries {
            let counts = hist
                .iter()
                .map(|(status, cnt)| format!("{}{}{}", style::status_badge(status), "x".dimmed(), cnt))
                .collect::<Vec<_>>()
                .join(" ");
            println!("{}  {:>4} cases  {}", id, hist.total(), counts);
        }
        return Ok(());
    };

    let cases = store.list_results(run_id);
    ensure!(!cases.is_empty(), "No case stored in run {}", run_id);
    for v in &cases {
        println!("{}", style::case_line(v, None));
    }
    Ok(())
}
