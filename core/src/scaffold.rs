use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use lazy_regex::regex_captures;

use crate::action::error::*;
use crate::assets;
use crate::template;

const GENVAL_TAG: &str = "genval";
const CHECKER_TAG: &str = "check";
const DEFAULT_EXT: &str = "cpp";

/// The three sources of a stress session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramFiles {
    pub solution: PathBuf,
    pub generator: PathBuf,
    pub checker: PathBuf,
}

impl ProgramFiles {
    /// `foo.cpp` -> `foo.genval.cpp`, `foo.check.cpp` next to it.
    pub fn for_solution(solution: impl AsRef<Path>) -> Self {
        let solution = solution.as_ref();
        Self {
            solution: solution.to_owned(),
            generator: sibling(solution, GENVAL_TAG),
            checker: sibling(solution, CHECKER_TAG),
        }
    }

    pub fn missing(&self) -> Vec<&Path> {
        [&self.solution, &self.generator, &self.checker]
            .into_iter()
            .filter(|p| !p.is_file())
            .map(PathBuf::as_path)
            .collect()
    }
}

fn sibling(solution: &Path, tag: &str) -> PathBuf {
    let stem = solution
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();
    let ext = solution
        .extension()
        .map(|s| s.to_string_lossy())
        .unwrap_or(DEFAULT_EXT.into());
    solution.with_file_name(format!("{}.{}.{}", stem, tag, ext))
}

/// Recovers `foo.cpp` from `foo.genval.cpp` or `foo.check.cpp`.
pub fn solution_for(program: impl AsRef<Path>) -> Option<PathBuf> {
    let program = program.as_ref();
    let filename = program.file_name()?.to_str()?;
    let (_, stem, _tag, ext) = regex_captures!(r"^(.+)\.(genval|check)\.([^.]+)$", filename)?;
    Some(program.with_file_name(format!("{}.{}", stem, ext)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Materialized {
    Created,
    Overwritten,
    Skipped,
}

/// Writes generator and checker stubs for `solution`.
/// Existing files are left alone unless `force`.
pub fn materialize(
    solution: impl AsRef<Path>,
    force: bool,
) -> Result<Vec<(PathBuf, Materialized)>> {
    let files = ProgramFiles::for_solution(&solution);
    let solution_name = files
        .solution
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let vars = HashMap::from([("solution", solution_name.as_str())]);

    let mut res = Vec::with_capacity(2);
    for (path, asset) in [
        (files.generator, assets::GENVAL_TEMPLATE),
        (files.checker, assets::CHECKER_TEMPLATE),
    ] {
        let exists = path.exists();
        if exists && !force {
            log::info!("Keeping existing {:?}", path);
            res.push((path, Materialized::Skipped));
            continue;
        }
        let contents = template::expand(&assets::text(asset), &vars)
            .with_context(|| format!("Broken template {}", asset))?;
        fsutil::write_with_mkdir(&path, contents)?;
        let how = if exists {
            Materialized::Overwritten
        } else {
            Materialized::Created
        };
        res.push((path, how));
    }
    Ok(res)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testutil::scratch_dir;

    #[test]
    fn paths_map_both_ways() {
        let f = ProgramFiles::for_solution("/w/abc123_a.cpp");
        assert_eq!(f.generator, Path::new("/w/abc123_a.genval.cpp"));
        assert_eq!(f.checker, Path::new("/w/abc123_a.check.cpp"));

        assert_eq!(solution_for(&f.generator), Some(PathBuf::from("/w/abc123_a.cpp")));
        assert_eq!(solution_for(&f.checker), Some(PathBuf::from("/w/abc123_a.cpp")));
        assert_eq!(solution_for("/w/abc123_a.cpp"), None);
        assert_eq!(solution_for("a.b.check.cc"), Some(PathBuf::from("a.b.cc")));

        let f = ProgramFiles::for_solution("sol");
        assert_eq!(f.generator, Path::new("sol.genval.cpp"));
    }

    #[test]
    fn materialize_respects_existing_files() {
        let dir = scratch_dir();
        let solution = dir.join("a.cpp");
        fsutil::write_with_mkdir(&solution, "int main() {}").unwrap();
        let files = ProgramFiles::for_solution(&solution);
        assert_eq!(files.missing(), [files.generator.as_path(), files.checker.as_path()]);

        fsutil::write(&files.checker, "mine").unwrap();
        let res = materialize(&solution, false).unwrap();
        assert_eq!(
            res,
            [
                (files.generator.clone(), Materialized::Created),
                (files.checker.clone(), Materialized::Skipped),
            ]
        );
        assert_eq!(fsutil::read_to_string(&files.checker).unwrap(), "mine");
        let generator = fsutil::read_to_string(&files.generator).unwrap();
        assert!(generator.contains("for a.cpp"));
        assert!(generator.contains("#include <random>"));
        assert!(files.missing().is_empty());

        let res = materialize(&solution, true).unwrap();
        assert!(res.iter().all(|(_, m)| *m == Materialized::Overwritten));
        assert!(fsutil::read_to_string(&files.checker).unwrap().contains("int main"));
        fsutil::remove_dir_all_if_exists(&dir).unwrap();
    }
}
