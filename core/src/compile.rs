use std::{
    path::{Path, PathBuf},
    process::Stdio,
    sync::Arc,
};

use async_trait::async_trait;
use tokio::process::Command;

use crate::report::Reporter;
use crate::template::{self, TemplateError};

pub const SOLUTION_EXEC: &str = "solution_exec";
pub const GENERATOR_EXEC: &str = "generator_exec";
pub const CHECKER_EXEC: &str = "checker_exec";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidCompileCommand {
    #[error("Compile command is empty")]
    Empty,

    #[error("Invalid compile command argument '{0}': {1}")]
    Template(String, #[source] TemplateError),
}

/// Toolchain argv with `#{source}`-style placeholders, expanded per argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileCommand {
    argv: Vec<String>,
}

impl CompileCommand {
    pub fn parse(argv: Vec<String>) -> Result<Self, InvalidCompileCommand> {
        if argv.is_empty() {
            return Err(InvalidCompileCommand::Empty);
        }
        let cmd = Self { argv };
        cmd.render(Path::new("dir/src.cpp"), Path::new("out"))?;
        Ok(cmd)
    }

    pub fn render(&self, source: &Path, output: &Path) -> Result<Vec<String>, InvalidCompileCommand> {
        let vars = template::compile_vars(source, output);
        self.argv
            .iter()
            .map(|arg| {
                template::expand(arg, &vars)
                    .map_err(|e| InvalidCompileCommand::Template(arg.to_owned(), e))
            })
            .collect()
    }
}

#[async_trait]
pub trait Compiler: Send + Sync {
    /// Builds `source` into `output`. Failures are reported, never returned.
    async fn compile(&self, source: &Path, output: &Path) -> bool;
}

/// Runs the configured toolchain as a child process.
pub struct ToolchainCompiler {
    command: CompileCommand,
    reporter: Arc<dyn Reporter>,
}

impl ToolchainCompiler {
    pub fn new(command: CompileCommand, reporter: Arc<dyn Reporter>) -> Self {
        Self { command, reporter }
    }

    fn fail(&self, source: &Path, diagnostic: &str) -> bool {
        let name = source
            .file_name()
            .map(|s| s.to_string_lossy())
            .unwrap_or_else(|| source.to_string_lossy());
        self.reporter
            .report_error(&format!("Compilation failed for {}: {}", name, diagnostic.trim_end()));
        false
    }
}

#[async_trait]
impl Compiler for ToolchainCompiler {
    async fn compile(&self, source: &Path, output: &Path) -> bool {
        let argv = match self.command.render(source, output) {
            Ok(argv) => argv,
            Err(e) => return self.fail(source, &e.to_string()),
        };
        log::info!("Compiling: {}", argv.join(" "));

        let res = Command::new(&argv[0])
            .args(&argv[1..])
            .stdin(Stdio::null())
            .output()
            .await;

        match res {
            Ok(out) if out.status.success() => true,
            Ok(out) => {
                let diag = if out.stderr.is_empty() {
                    String::from_utf8_lossy(&out.stdout)
                } else {
                    String::from_utf8_lossy(&out.stderr)
                };
                self.fail(source, &diag)
            }
            Err(e) => self.fail(source, &format!("cannot run '{}': {}", argv[0], e)),
        }
    }
}

/// Compiled programs of one session, all inside its temp dir.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutableSet {
    pub solution: PathBuf,
    pub generator: Option<PathBuf>,
    pub checker: PathBuf,
}

/// Compiles the solution, the generator (when given) and the checker into `temp_dir`.
/// Stops at the first failure, which the compiler has already reported.
pub async fn compile_all<C>(
    compiler: &C,
    temp_dir: &Path,
    solution: &Path,
    generator: Option<&Path>,
    checker: &Path,
) -> Option<ExecutableSet>
where
    C: Compiler + ?Sized,
{
    let set = ExecutableSet {
        solution: temp_dir.join(SOLUTION_EXEC),
        generator: generator.map(|_| temp_dir.join(GENERATOR_EXEC)),
        checker: temp_dir.join(CHECKER_EXEC),
    };

    if !compiler.compile(solution, &set.solution).await {
        return None;
    }
    if let (Some(src), Some(exe)) = (generator, &set.generator) {
        if !compiler.compile(src, exe).await {
            return None;
        }
    }
    if !compiler.compile(checker, &set.checker).await {
        return None;
    }
    Some(set)
}
