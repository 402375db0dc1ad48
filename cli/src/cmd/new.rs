use std::path::PathBuf;

use colored::Colorize;
use cpst_core::{action, scaffold::Materialized};

use crate::util;

use super::{GlobalArgs, SubcmdResult};

#[derive(Debug, clap::Args)]
pub struct Args {
    /// Solution source; stubs are written next to it
    pub solution: PathBuf,

    /// Overwrite existing generator/checker
    #[arg(short, long)]
    pub force: bool,
}

pub fn exec(args: &Args, _: &GlobalArgs) -> SubcmdResult {
    for (path, how) in action::scaffold(&args.solution, args.force)? {
        let path = util::replace_homedir_to_tilde(path);
        let label = match how {
            Materialized::Created => "Created".green(),
            Materialized::Overwritten => "Overwritten".yellow(),
            Materialized::Skipped => "Skipped (exists)".dimmed(),
        };
        println!("{:>16} {}", label, path.to_string_lossy());
    }
    Ok(())
}
