#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use maggot::types::{
    BaselineUnbuildable, BuildOutcome, BuildTarget, BuildVerdict, FileReference, MutationError,
    MutationResult, Project, ProjectOutcome, ProjectProgress, RevertError, RunStatistics, Solution,
};
use maggot::{BuildOracle, ProgressReporter, ReferenceMutator, WorkspaceReverter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Prepare(PathBuf),
    Revert(PathBuf),
    Remove(PathBuf, String),
    Build(PathBuf),
}

/// What is "on disk" for every project directory, plus a log of calls.
#[derive(Debug, Default)]
pub struct Workspace {
    pub pristine: HashMap<PathBuf, Vec<String>>,
    pub current: HashMap<PathBuf, Vec<String>>,
    pub calls: Vec<Call>,
    /// File list seen by each build, in call order.
    pub built: Vec<(PathBuf, Vec<String>)>,
}

pub type Shared = Arc<Mutex<Workspace>>;

pub fn project(dir: &str, files: &[&str]) -> Project {
    let dir = PathBuf::from("/ws").join(dir);
    let name = dir.file_name().unwrap().to_string_lossy().into_owned();
    Project::new(
        dir.join(format!("{name}.vcxproj")),
        files.iter().map(|f| FileReference::new(*f)).collect(),
    )
}

pub fn solution(projects: Vec<Project>) -> Solution {
    Solution::new(PathBuf::from("/ws/all.sln"), projects).unwrap()
}

/// Seeds the on-disk state from the projects' own file lists.
pub fn workspace(solution: &Solution) -> Shared {
    let mut ws = Workspace::default();
    for p in solution.projects() {
        let files: Vec<String> = p.files.iter().map(|f| f.as_str().to_string()).collect();
        ws.pristine.insert(p.directory.clone(), files.clone());
        ws.current.insert(p.directory.clone(), files);
    }
    Arc::new(Mutex::new(ws))
}

pub fn calls(ws: &Shared) -> Vec<Call> {
    ws.lock().unwrap().calls.clone()
}

type Rule = Box<dyn Fn(&Path, &[String]) -> BuildVerdict>;

/// Decides each build from the project directory and its current file list.
pub struct FakeOracle {
    pub ws: Shared,
    pub rule: Rule,
}

impl FakeOracle {
    pub fn new(ws: &Shared, rule: impl Fn(&Path, &[String]) -> BuildVerdict + 'static) -> Self {
        Self {
            ws: Arc::clone(ws),
            rule: Box::new(rule),
        }
    }
}

impl BuildOracle for FakeOracle {
    async fn build(&self, target: &BuildTarget) -> BuildOutcome {
        let dir = target.project.parent().unwrap().to_path_buf();
        let mut ws = self.ws.lock().unwrap();
        let files = ws.current.get(&dir).cloned().unwrap_or_default();
        ws.calls.push(Call::Build(dir.clone()));
        ws.built.push((dir.clone(), files.clone()));
        BuildOutcome::new((self.rule)(&dir, &files))
    }
}

pub struct FakeReverter {
    pub ws: Shared,
    /// Fail the n-th (0-based) revert of the given directory.
    pub fail_on: Option<(PathBuf, usize)>,
}

impl FakeReverter {
    pub fn new(ws: &Shared) -> Self {
        Self {
            ws: Arc::clone(ws),
            fail_on: None,
        }
    }
}

impl WorkspaceReverter for FakeReverter {
    async fn prepare(&self, directory: &Path) -> Result<(), RevertError> {
        self.ws
            .lock()
            .unwrap()
            .calls
            .push(Call::Prepare(directory.to_path_buf()));
        Ok(())
    }

    async fn revert(&self, directory: &Path) -> Result<(), RevertError> {
        let mut ws = self.ws.lock().unwrap();
        let previous = ws
            .calls
            .iter()
            .filter(|c| matches!(c, Call::Revert(d) if d == directory))
            .count();
        ws.calls.push(Call::Revert(directory.to_path_buf()));
        if let Some((dir, nth)) = &self.fail_on
            && dir == directory
            && *nth == previous
        {
            return Err(RevertError::MissingSnapshot(directory.to_path_buf()));
        }
        let pristine = ws.pristine.get(directory).cloned().unwrap_or_default();
        ws.current.insert(directory.to_path_buf(), pristine);
        Ok(())
    }
}

pub struct FakeMutator {
    pub ws: Shared,
    pub fail_on: Option<String>,
}

impl FakeMutator {
    pub fn new(ws: &Shared) -> Self {
        Self {
            ws: Arc::clone(ws),
            fail_on: None,
        }
    }
}

impl ReferenceMutator for FakeMutator {
    async fn remove_reference(
        &self,
        project: &Project,
        file: &FileReference,
    ) -> Result<MutationResult, MutationError> {
        let mut ws = self.ws.lock().unwrap();
        ws.calls.push(Call::Remove(
            project.directory.clone(),
            file.as_str().to_string(),
        ));
        if self.fail_on.as_deref() == Some(file.as_str()) {
            return Err(MutationError::Malformed {
                path: project.path.clone(),
                message: "unexpected end of file".to_string(),
            });
        }
        let current = ws.current.entry(project.directory.clone()).or_default();
        match current.iter().position(|f| f == file.as_str()) {
            Some(index) => {
                current.remove(index);
                Ok(MutationResult::Removed)
            }
            None => Ok(MutationResult::NoMatch),
        }
    }
}

/// Keeps a copy of the statistics every time a project finishes.
#[derive(Default)]
pub struct RecordingReporter {
    pub project_stats: Vec<RunStatistics>,
    pub progress: Vec<ProjectProgress>,
    pub classified: Vec<(String, BuildVerdict)>,
    pub fatal: Vec<BaselineUnbuildable>,
    pub aborted: Vec<String>,
    pub finished: bool,
}

impl ProgressReporter for RecordingReporter {
    fn file_classified(&mut self, _project: &Project, file: &FileReference, outcome: &BuildOutcome) {
        self.classified
            .push((file.as_str().to_string(), outcome.verdict));
    }

    fn project_finished(
        &mut self,
        project: &Project,
        outcome: &ProjectOutcome,
        progress: &ProjectProgress,
        stats: &RunStatistics,
    ) {
        if matches!(outcome, ProjectOutcome::Aborted { .. }) {
            self.aborted.push(project.name.clone());
        }
        self.progress.push(progress.clone());
        self.project_stats.push(stats.clone());
    }

    fn fatal(&mut self, error: &BaselineUnbuildable, _stats: &RunStatistics) {
        self.fatal.push(error.clone());
    }

    fn run_finished(&mut self, _summary: &maggot::types::RunSummary) {
        self.finished = true;
    }
}
