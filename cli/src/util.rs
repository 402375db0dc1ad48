use std::{
    path::{Path, PathBuf},
    process::exit,
};

use cpst_core::storage::SolutionName;

pub fn current_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|e| {
        eprintln!("Failed to get current dir: {}", e);
        exit(1);
    })
}

pub fn replace_homedir_to_tilde(path: impl Into<PathBuf>) -> PathBuf {
    let path = path.into();
    let Some(home_dir) = ::dirs::home_dir() else {
        return path
    };
    path.strip_prefix(home_dir)
        .map(|path| Path::new("~").join(path))
        .unwrap_or(path)
}

/// Accepts either a path to the solution or its stored name.
pub fn solution_name(arg: &Path) -> SolutionName {
    SolutionName::from_solution_path(arg)
}
