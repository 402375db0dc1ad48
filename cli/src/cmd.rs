pub mod init;
pub mod new;
pub mod rerun;
pub mod results;
pub mod rm;
pub mod show;
pub mod stress;

use std::path::PathBuf;
use std::sync::Arc;

use cpst_core::{
    report::{ConsoleReporter, JsonLinesReporter, Reporter},
    storage::ResultStore,
    Config,
};

use crate::util;

#[derive(Debug, clap::Parser)]
#[command(author, version, about, long_about = None)]
pub struct GlobalArgs {
    #[command(subcommand)]
    pub subcmd: Subcommand,

    /// Result store directory (overrides `store.dir` and CPST_STORE_DIR)
    #[arg(long, global = true)]
    pub store_dir: Option<PathBuf>,
}

#[derive(Debug, clap::Subcommand)]
pub enum Subcommand {
    Init(init::Args),
    New(new::Args),

    #[command(alias("s"))]
    Stress(stress::Args),

    #[command(alias("r"))]
    Rerun(rerun::Args),

    #[command(alias("ls"))]
    Results(results::Args),

    Show(show::Args),
    Rm(rm::Args),
}

pub type SubcmdResult = anyhow::Result<()>;

impl GlobalArgs {
    pub async fn exec_subcmd(&self) -> SubcmdResult {
        use Subcommand::*;
        match &self.subcmd {
            Init(args) => init::exec(args, self),
            New(args) => new::exec(args, self),
            Stress(args) => stress::exec(args, self).await,
            Rerun(args) => rerun::exec(args, self).await,
            Results(args) => results::exec(args, self),
            Show(args) => show::exec(args, self),
            Rm(args) => rm::exec(args, self),
        }
    }

    pub fn load_config(&self) -> anyhow::Result<Config> {
        let mut cfg = Config::load(util::current_dir())?;
        if let Some(dir) = &self.store_dir {
            cfg.store.dir = dir.clone();
        }
        log::debug!("Config file: {:?}", cfg.source_config_file);
        Ok(cfg)
    }

    pub fn store(&self, cfg: &Config) -> ResultStore {
        let root = cfg.store_root(util::current_dir());
        log::debug!("Result store: {:?}", root);
        ResultStore::new(root)
    }
}

pub fn reporter(json: bool, show_failure_detail: bool) -> Arc<dyn Reporter> {
    if json {
        Arc::new(JsonLinesReporter::stdout())
    } else {
        Arc::new(ConsoleReporter::new().show_failure_detail(show_failure_detail))
    }
}
