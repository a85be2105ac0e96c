use std::path::PathBuf;

use chrono::{DateTime, Local};
use serde::Serialize;
use strum::Display;

use crate::types::{FileReference, Project, RunStatistics};

/// Files classified dead for one project, in discovery order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeadFileReport {
    pub project: PathBuf,
    pub project_name: String,
    pub dead_files: Vec<FileReference>,
}

impl DeadFileReport {
    pub fn new(project: &Project) -> Self {
        Self {
            project: project.path.clone(),
            project_name: project.name.clone(),
            dead_files: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.dead_files.is_empty()
    }
}

#[derive(Debug)]
pub enum ProjectOutcome {
    /// Every file was classified.
    Completed(DeadFileReport),
    /// The pass stopped early; the report holds what was classified before.
    Aborted {
        report: DeadFileReport,
        reason: String,
        file: Option<FileReference>,
    },
    /// Ctrl-C was received between two files.
    Interrupted(DeadFileReport),
}

impl ProjectOutcome {
    pub fn report(&self) -> &DeadFileReport {
        match self {
            ProjectOutcome::Completed(report)
            | ProjectOutcome::Interrupted(report)
            | ProjectOutcome::Aborted { report, .. } => report,
        }
    }

    pub fn into_report(self) -> DeadFileReport {
        match self {
            ProjectOutcome::Completed(report)
            | ProjectOutcome::Interrupted(report)
            | ProjectOutcome::Aborted { report, .. } => report,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AbortedProject {
    pub project: PathBuf,
    pub reason: String,
    pub file: Option<FileReference>,
}

/// Raised when a project does not build before any perturbation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BaselineUnbuildable {
    pub project: PathBuf,
    pub log: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
pub enum RunState {
    NotStarted,
    ProcessingProjects,
    Finished,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub solution: PathBuf,
    pub state: RunState,
    /// Only projects with at least one dead file.
    pub reports: Vec<DeadFileReport>,
    pub aborted: Vec<AbortedProject>,
    pub fatal: Option<BaselineUnbuildable>,
    pub interrupted: bool,
    pub stats: RunStatistics,
    pub started_at: DateTime<Local>,
    pub finished_at: Option<DateTime<Local>>,
}

impl RunSummary {
    pub fn new(solution: PathBuf, stats: RunStatistics) -> Self {
        Self {
            solution,
            state: RunState::NotStarted,
            reports: Vec::new(),
            aborted: Vec::new(),
            fatal: None,
            interrupted: false,
            stats,
            started_at: Local::now(),
            finished_at: None,
        }
    }

    pub fn report_for(&self, project: &std::path::Path) -> Option<&DeadFileReport> {
        self.reports.iter().find(|r| r.project == project)
    }
}
