use cpst_core::{action, storage::RunId, style};

use super::{GlobalArgs, SubcmdResult};

#[derive(Debug, clap::Args)]
pub struct Args {
    pub run_id: RunId,

    #[arg(value_name = "CASE")]
    pub case_no: u32,
}

pub fn exec(args: &Args, global_args: &GlobalArgs) -> SubcmdResult {
    let cfg = global_args.load_config()?;
    let store = global_args.store(&cfg);

    let verdict = action::show_case(&store, &args.run_id, args.case_no)?;
    if let Some(owner) = store.find_owner(&args.run_id) {
        println!("{} / {}", owner, args.run_id);
    }
    println!("{}", style::case_line(&verdict, None));
    style::print_case_detail(&verdict);
    Ok(())
}
