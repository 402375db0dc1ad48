use std::path::{Path, PathBuf};
use std::result::Result as StdResult;
use std::time::Duration;

use anyhow::Context as _;
use serde::Deserialize;

use crate::assets;
use crate::storage::ResultStore;
use crate::testing::ExecLimits;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(skip)]
    pub source_config_file: Option<PathBuf>,
    pub store: StoreConfig,
    pub compile: CompileConfig,
    pub execution: ExecutionConfig,
    pub stress: StressConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CompileConfig {
    pub command: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    pub time_limit_ms: u64,
    pub output_limit_bytes: usize,
    pub launcher: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StressConfig {
    pub num_tests: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(ResultStore::DEFAULT_DIRNAME),
        }
    }
}

impl Default for CompileConfig {
    fn default() -> Self {
        let command = ["g++", "-std=c++17", "-O2", "-Wall", "#{source}", "-o", "#{output}"];
        Self {
            command: command.into_iter().map(str::to_owned).collect(),
        }
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            time_limit_ms: ExecLimits::DEFAULT_TIMEOUT.as_millis() as u64,
            output_limit_bytes: ExecLimits::DEFAULT_MAX_OUTPUT_BYTES,
            launcher: None,
        }
    }
}

impl Default for StressConfig {
    fn default() -> Self {
        Self { num_tests: 100 }
    }
}

/// `CPST_*` environment variables. They take precedence over the file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EnvOverrides {
    pub time_limit_ms: Option<u64>,
    pub output_limit_bytes: Option<usize>,
    pub num_tests: Option<u32>,
    pub store_dir: Option<PathBuf>,
}

impl EnvOverrides {
    pub const PREFIX: &'static str = "CPST_";

    pub fn from_env() -> StdResult<Self, envy::Error> {
        envy::prefixed(Self::PREFIX).from_env()
    }
}

impl Config {
    pub const FILENAME: &'static str = "cpst.toml";

    pub fn example_toml() -> String {
        assets::text(assets::CONFIG_TOML)
    }

    pub fn from_toml(s: &str) -> StdResult<Self, toml::de::Error> {
        toml::from_str(s)
    }

    pub fn from_toml_file(filepath: PathBuf) -> anyhow::Result<Self> {
        let toml = fsutil::read_to_string(&filepath).context("Cannot read a file")?;
        let mut cfg = Self::from_toml(&toml)
            .with_context(|| format!("Invalid config TOML: {:?}", filepath))?;
        cfg.source_config_file = Some(filepath);
        Ok(cfg)
    }

    /// Find config file ancestor dirs, including current dir.
    pub fn find_file_in_ancestors(cur_dir: impl AsRef<Path>) -> Option<PathBuf> {
        cur_dir
            .as_ref()
            .ancestors()
            .map(|dir| dir.join(Self::FILENAME))
            .find(|path| path.is_file())
    }

    /// Nearest `cpst.toml` (or the defaults) with `CPST_*` overrides applied.
    pub fn load(cur_dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        let mut cfg = match Self::find_file_in_ancestors(&cur_dir) {
            Some(path) => {
                log::info!("Using config {:?}", path);
                Self::from_toml_file(path)?
            }
            None => {
                log::info!("No {} found, using defaults", Self::FILENAME);
                Self::default()
            }
        };
        let env = EnvOverrides::from_env().context("Invalid CPST_* environment variable")?;
        cfg.apply_env(env);
        Ok(cfg)
    }

    pub fn apply_env(&mut self, env: EnvOverrides) {
        let EnvOverrides {
            time_limit_ms,
            output_limit_bytes,
            num_tests,
            store_dir,
        } = env;
        if let Some(v) = time_limit_ms {
            self.execution.time_limit_ms = v;
        }
        if let Some(v) = output_limit_bytes {
            self.execution.output_limit_bytes = v;
        }
        if let Some(v) = num_tests {
            self.stress.num_tests = v;
        }
        if let Some(v) = store_dir {
            self.store.dir = v;
        }
    }

    /// Store root. A relative `store.dir` is taken from the config file's directory,
    /// or from `cur_dir` when running on defaults.
    pub fn store_root(&self, cur_dir: impl AsRef<Path>) -> PathBuf {
        if self.store.dir.is_absolute() {
            return self.store.dir.clone();
        }
        let base = self
            .source_config_file
            .as_deref()
            .and_then(Path::parent)
            .unwrap_or(cur_dir.as_ref());
        base.join(self.store.dir.strip_prefix(".").unwrap_or(&self.store.dir))
    }

    pub fn exec_limits(&self) -> ExecLimits {
        ExecLimits {
            timeout: Duration::from_millis(self.execution.time_limit_ms),
            max_output_bytes: self.execution.output_limit_bytes,
        }
    }
}
