use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use fsutil::Result;
use lazy_regex::{lazy_regex, Lazy, Regex};

use super::ids::{RunId, SolutionName};
use crate::testing::CaseVerdict;

/// Persisted `main.json`: solution name -> run ids in creation order.
pub type SolutionIndex = BTreeMap<SolutionName, Vec<RunId>>;

static RESULT_FILENAME: Lazy<Regex> = lazy_regex!(r"^test_(\d+)\.json$");
static RESULT_GLOB: Lazy<glob::Pattern> = Lazy::new(|| glob::Pattern::new("test_*.json").unwrap());

/// Paths prepared for one session by [`ResultStore::setup`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPaths {
    pub temp_dir: PathBuf,
    pub results_dir: PathBuf,
    pub index_file: PathBuf,
    pub solution_name: SolutionName,
    pub run_id: RunId,
    pub run_dir: PathBuf,
}

/// File-backed bookkeeping of solutions, runs and case verdicts.
///
/// ```text
/// <root>/temp/                     executables, input.txt, output.txt
/// <root>/results/main.json         SolutionIndex
/// <root>/results/<runId>/test_<n>.json
/// ```
///
/// Nothing is cached: every call re-reads the index.
#[derive(Debug, Clone)]
pub struct ResultStore {
    root: PathBuf,
}

impl ResultStore {
    pub const DEFAULT_DIRNAME: &'static str = ".cpst";
    const TEMP_DIRNAME: &'static str = "temp";
    const RESULTS_DIRNAME: &'static str = "results";
    const INDEX_FILENAME: &'static str = "main.json";

    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn temp_dir(&self) -> PathBuf {
        self.root.join(Self::TEMP_DIRNAME)
    }

    pub fn results_dir(&self) -> PathBuf {
        self.root.join(Self::RESULTS_DIRNAME)
    }

    pub fn index_file(&self) -> PathBuf {
        self.results_dir().join(Self::INDEX_FILENAME)
    }

    pub fn run_dir(&self, run_id: &RunId) -> PathBuf {
        self.results_dir().join(run_id)
    }

    pub fn result_file(&self, run_id: &RunId, case_no: u32) -> PathBuf {
        self.run_dir(run_id).join(Self::result_filename(case_no))
    }

    fn result_filename(case_no: u32) -> String {
        format!("test_{}.json", case_no)
    }

    /// Creates the temp and results dirs and a fresh run dir.
    pub fn setup(&self, solution_path: impl AsRef<Path>) -> Result<SessionPaths> {
        let temp_dir = self.temp_dir();
        let results_dir = self.results_dir();
        fsutil::mkdir_all(&temp_dir)?;
        fsutil::mkdir_all(&results_dir)?;

        let run_id = RunId::generate();
        let run_dir = self.run_dir(&run_id);
        fsutil::mkdir_all(&run_dir)?;
        log::debug!("Prepared run dir {:?}", run_dir);

        Ok(SessionPaths {
            temp_dir,
            results_dir,
            index_file: self.index_file(),
            solution_name: SolutionName::from_solution_path(solution_path),
            run_id,
            run_dir,
        })
    }

    /// Registers `run_id` under `name`. Calling it again with the same pair changes nothing.
    pub fn initialize_run(&self, name: &SolutionName, run_id: &RunId) -> Result<()> {
        let mut index = self.load_index_for_update()?;
        let runs = index.entry(name.clone()).or_default();
        if !runs.contains(run_id) {
            runs.push(run_id.clone());
        }
        fsutil::mkdir_all(self.run_dir(run_id))?;
        self.save_index(&index)
    }

    /// Writes `test_<n>.json` under `run_dir`, replacing any previous file for that case.
    pub fn save_result(&self, run_dir: impl AsRef<Path>, verdict: &CaseVerdict) -> Result<()> {
        let path = run_dir
            .as_ref()
            .join(Self::result_filename(verdict.case_no));
        fsutil::write_json_with_mkdir(path, verdict)
    }

    pub fn update_result(&self, run_id: &RunId, verdict: &CaseVerdict) -> Result<()> {
        self.save_result(self.run_dir(run_id), verdict)
    }

    pub fn read_result(&self, run_id: &RunId, case_no: u32) -> Result<CaseVerdict> {
        fsutil::read_json_with_deserialize(self.result_file(run_id, case_no))
    }

    pub fn list_solutions(&self) -> Vec<SolutionName> {
        self.load_index().into_keys().collect()
    }

    pub fn list_runs(&self, name: &SolutionName) -> Vec<RunId> {
        self.load_index().remove(name).unwrap_or_default()
    }

    /// Verdicts of a run sorted by case number. Unreadable files are skipped.
    pub fn list_results(&self, run_id: &RunId) -> Vec<CaseVerdict> {
        let files = match fsutil::list_files_matching(self.run_dir(run_id), &RESULT_GLOB) {
            Ok(files) => files,
            Err(e) => {
                if !e.is_not_found() {
                    log::warn!("{}", e);
                }
                return Vec::new();
            }
        };

        let mut verdicts: Vec<CaseVerdict> = files
            .iter()
            .filter(|path| {
                path.file_name()
                    .map_or(false, |s| RESULT_FILENAME.is_match(&s.to_string_lossy()))
            })
            .filter_map(|path| match fsutil::read_json_with_deserialize(path) {
                Ok(v) => Some(v),
                Err(e) => {
                    log::warn!("Skipping unreadable result: {}", e);
                    None
                }
            })
            .collect();
        verdicts.sort_by_key(|v| v.case_no);
        verdicts
    }

    /// The solution whose index entry lists `run_id`.
    pub fn find_owner(&self, run_id: &RunId) -> Option<SolutionName> {
        self.load_index()
            .into_iter()
            .find(|(_, runs)| runs.contains(run_id))
            .map(|(name, _)| name)
    }

    /// Removes the solution's entry and every run dir listed under it.
    /// Returns `false` if the solution was unknown.
    pub fn delete_solution(&self, name: &SolutionName) -> Result<bool> {
        let mut index = self.load_index_for_update()?;
        let Some(runs) = index.remove(name) else {
            return Ok(false)
        };
        for run_id in &runs {
            fsutil::remove_dir_all_if_exists(self.run_dir(run_id))?;
        }
        self.save_index(&index)?;
        log::info!("Deleted solution {} ({} runs)", name, runs.len());
        Ok(true)
    }

    /// Removes the run dir and scrubs `run_id` from every solution's entry.
    pub fn delete_run(&self, run_id: &RunId) -> Result<bool> {
        let removed_dir = fsutil::remove_dir_all_if_exists(self.run_dir(run_id))?;

        let mut index = self.load_index_for_update()?;
        let mut scrubbed = false;
        for runs in index.values_mut() {
            let before = runs.len();
            runs.retain(|id| id != run_id);
            scrubbed |= runs.len() != before;
        }
        if scrubbed {
            self.save_index(&index)?;
        }
        Ok(removed_dir || scrubbed)
    }

    pub fn delete_result(&self, run_id: &RunId, case_no: u32) -> Result<bool> {
        fsutil::remove_file_if_exists(self.result_file(run_id, case_no))
    }

    /// Best-effort recursive removal. Already missing paths are fine.
    pub fn cleanup<P: AsRef<Path>>(&self, paths: &[P]) {
        for path in paths {
            if let Err(e) = fsutil::remove_dir_all_if_exists(path) {
                log::warn!("Cleanup failed: {}", e);
            }
        }
    }

    /// Missing or corrupt index reads as empty.
    fn load_index(&self) -> SolutionIndex {
        match fsutil::read_json_with_deserialize(self.index_file()) {
            Ok(index) => index,
            Err(e) => {
                if !e.is_not_found() {
                    log::warn!("Ignoring unreadable index: {}", e);
                }
                SolutionIndex::new()
            }
        }
    }

    /// Missing index reads as empty, but a corrupt one is an error so it is not overwritten.
    fn load_index_for_update(&self) -> Result<SolutionIndex> {
        match fsutil::read_json_with_deserialize(self.index_file()) {
            Ok(index) => Ok(index),
            Err(e) if e.is_not_found() => Ok(SolutionIndex::new()),
            Err(e) => Err(e),
        }
    }

    fn save_index(&self, index: &SolutionIndex) -> Result<()> {
        fsutil::write_json_with_mkdir(self.index_file(), index)
    }
}
