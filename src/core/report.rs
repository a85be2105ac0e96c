use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use log::{debug, error, info};

use crate::types::{
    BaselineUnbuildable, BuildOutcome, DeadFileReport, FileReference, Project, ProjectOutcome,
    ProjectProgress, ReportError, RunStatistics, RunSummary, Solution,
};

const RULE: &str = "-----------------------------";
const BANNER: &str = "=============================";
const ALERT: &str = "*****************************";

pub const DEAD_FILE_DIR: &str = "DeadFileSummaries";
pub const SUMMARY_FILE: &str = "summary.json";

/// Observer of engine progress. Nothing here feeds back into classification.
pub trait ProgressReporter {
    fn run_started(&mut self, _solution: &Solution, _stats: &RunStatistics) {}

    fn project_started(&mut self, _project: &Project, _index: usize, _stats: &RunStatistics) {}

    fn baseline_verified(&mut self, _project: &Project, _outcome: &BuildOutcome) {}

    fn file_started(&mut self, _project: &Project, _file: &FileReference, _index: usize) {}

    fn file_classified(
        &mut self,
        _project: &Project,
        _file: &FileReference,
        _outcome: &BuildOutcome,
    ) {
    }

    fn project_finished(
        &mut self,
        _project: &Project,
        _outcome: &ProjectOutcome,
        _progress: &ProjectProgress,
        _stats: &RunStatistics,
    ) {
    }

    fn fatal(&mut self, _error: &BaselineUnbuildable, _stats: &RunStatistics) {}

    fn run_finished(&mut self, _summary: &RunSummary) {}
}

impl ProgressReporter for () {}

impl<A: ProgressReporter, B: ProgressReporter> ProgressReporter for (A, B) {
    fn run_started(&mut self, solution: &Solution, stats: &RunStatistics) {
        self.0.run_started(solution, stats);
        self.1.run_started(solution, stats);
    }

    fn project_started(&mut self, project: &Project, index: usize, stats: &RunStatistics) {
        self.0.project_started(project, index, stats);
        self.1.project_started(project, index, stats);
    }

    fn baseline_verified(&mut self, project: &Project, outcome: &BuildOutcome) {
        self.0.baseline_verified(project, outcome);
        self.1.baseline_verified(project, outcome);
    }

    fn file_started(&mut self, project: &Project, file: &FileReference, index: usize) {
        self.0.file_started(project, file, index);
        self.1.file_started(project, file, index);
    }

    fn file_classified(
        &mut self,
        project: &Project,
        file: &FileReference,
        outcome: &BuildOutcome,
    ) {
        self.0.file_classified(project, file, outcome);
        self.1.file_classified(project, file, outcome);
    }

    fn project_finished(
        &mut self,
        project: &Project,
        outcome: &ProjectOutcome,
        progress: &ProjectProgress,
        stats: &RunStatistics,
    ) {
        self.0.project_finished(project, outcome, progress, stats);
        self.1.project_finished(project, outcome, progress, stats);
    }

    fn fatal(&mut self, error: &BaselineUnbuildable, stats: &RunStatistics) {
        self.0.fatal(error, stats);
        self.1.fatal(error, stats);
    }

    fn run_finished(&mut self, summary: &RunSummary) {
        self.0.run_finished(summary);
        self.1.run_finished(summary);
    }
}

/// Human readable progress through the `log` facade.
pub struct LogReporter {
    started: Instant,
}

impl LogReporter {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    fn log_totals(&self, stats: &RunStatistics) {
        info!(
            "Total time elapsed: {}",
            readable_duration(self.started.elapsed())
        );
        info!(
            "{} dead files identified so far ({} of files processed so far)",
            stats.dead_files_found(),
            format_percent(stats.dead_ratio())
        );
        info!(
            "{} projects (of {}) processed so far ({})",
            stats.projects_completed(),
            stats.projects_to_process,
            format_percent(stats.project_progress())
        );
        info!(
            "{} files (of {}) processed so far ({})",
            stats.files_completed(),
            stats.files_to_process,
            format_percent(stats.file_progress())
        );
    }
}

impl Default for LogReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for LogReporter {
    fn run_started(&mut self, solution: &Solution, stats: &RunStatistics) {
        info!("Beginning analysis of {}", solution.path.display());
        info!("{BANNER}");
        info!("Projects: {}", stats.projects_to_process);
        info!("Implementation Files: {}", stats.files_to_process);
        info!("{BANNER}");
        info!("Beginning debridement");
    }

    fn project_started(&mut self, project: &Project, index: usize, stats: &RunStatistics) {
        info!("{RULE}");
        info!(
            "Processing {} ({}/{})",
            project.display(),
            index,
            stats.projects_to_process
        );
        info!("{RULE}");
        info!("Verifying solution will build before processing project");
    }

    fn baseline_verified(&mut self, _project: &Project, _outcome: &BuildOutcome) {
        info!("Solution built successfully");
        info!("{RULE}");
    }

    fn file_started(&mut self, project: &Project, file: &FileReference, index: usize) {
        info!("{} ({}/{})", file, index, project.files.len());
    }

    fn file_classified(
        &mut self,
        _project: &Project,
        file: &FileReference,
        outcome: &BuildOutcome,
    ) {
        if outcome.verdict.is_success() {
            info!("*** Build succeeded: Dead code identified! ***");
        } else {
            debug!("{file} is needed ({}ms)", outcome.duration_ms);
        }
    }

    fn project_finished(
        &mut self,
        project: &Project,
        outcome: &ProjectOutcome,
        progress: &ProjectProgress,
        stats: &RunStatistics,
    ) {
        match outcome {
            ProjectOutcome::Completed(_) => {}
            ProjectOutcome::Interrupted(_) => {
                info!("Interrupted while processing {}", project.display());
            }
            ProjectOutcome::Aborted { reason, file, .. } => {
                error!("{ALERT}");
                error!(
                    "An unexpected error occurred when processing project {}",
                    project.display()
                );
                if let Some(file) = file {
                    error!("While testing: {file}");
                }
                error!("{reason}");
                error!(
                    "Counters at failure: {} projects, {} files, {} dead files",
                    stats.projects_completed(),
                    stats.files_completed(),
                    stats.dead_files_found()
                );
                error!("{ALERT}");
            }
        }

        info!("{RULE}");
        info!(
            "{} dead files identified in this project ({} of files in project)",
            progress.dead_files,
            format_percent(progress.dead_ratio())
        );
        self.log_totals(stats);
    }

    fn fatal(&mut self, error: &BaselineUnbuildable, _stats: &RunStatistics) {
        error!(
            "Solution is not in a buildable state - unable to perform debridement! ({})",
            error.project.display()
        );
        if let Some(log) = &error.log {
            error!("See build log: {}", log.display());
        }
    }

    fn run_finished(&mut self, summary: &RunSummary) {
        info!("{RULE}");
        if summary.fatal.is_some() {
            info!("Debridement halted.");
        } else if summary.interrupted {
            info!("Debridement interrupted.");
        } else {
            info!("Debridement complete!");
        }
        if !summary.aborted.is_empty() {
            info!(
                "{} project(s) were skipped after errors",
                summary.aborted.len()
            );
        }
        self.log_totals(&summary.stats);
    }
}

/// Persists per-project dead file lists and the final run summary.
pub struct ResultWriter {
    directory: PathBuf,
}

impl ResultWriter {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// Creates a timestamped run directory below `root`.
    pub fn create(root: &Path, started: DateTime<Local>) -> Result<Self, ReportError> {
        let directory = root.join(run_directory_name(started));
        fs::create_dir_all(&directory).map_err(|source| ReportError::Io {
            path: directory.clone(),
            source,
        })?;
        Ok(Self::new(directory))
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Writes `DeadFileSummaries/<project>.txt`; projects without dead files
    /// produce nothing.
    pub fn write_dead_files(
        &self,
        report: &DeadFileReport,
    ) -> Result<Option<PathBuf>, ReportError> {
        if report.is_empty() {
            return Ok(None);
        }
        let target_dir = self.directory.join(DEAD_FILE_DIR);
        fs::create_dir_all(&target_dir).map_err(|source| ReportError::Io {
            path: target_dir.clone(),
            source,
        })?;

        let path = target_dir.join(format!("{}.txt", report.project_name));
        let mut contents = report
            .dead_files
            .iter()
            .map(FileReference::as_str)
            .collect::<Vec<_>>()
            .join("\n");
        contents.push('\n');
        fs::write(&path, contents).map_err(|source| ReportError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(Some(path))
    }

    pub fn write_summary(&self, summary: &RunSummary) -> Result<PathBuf, ReportError> {
        fs::create_dir_all(&self.directory).map_err(|source| ReportError::Io {
            path: self.directory.clone(),
            source,
        })?;
        let path = self.directory.join(SUMMARY_FILE);
        let json = serde_json::to_string_pretty(summary)?;
        fs::write(&path, json).map_err(|source| ReportError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}

impl ProgressReporter for ResultWriter {
    fn project_finished(
        &mut self,
        _project: &Project,
        outcome: &ProjectOutcome,
        _progress: &ProjectProgress,
        _stats: &RunStatistics,
    ) {
        let report = outcome.report();
        debug!("{RULE}");
        debug!(
            "Writing out {} files to {DEAD_FILE_DIR}",
            report.dead_files.len()
        );
        match self.write_dead_files(report) {
            Ok(Some(path)) => debug!("Wrote {}", path.display()),
            Ok(None) => {}
            Err(e) => error!("{e}"),
        }
    }

    fn run_finished(&mut self, summary: &RunSummary) {
        match self.write_summary(summary) {
            Ok(path) => info!("Run summary written to {}", path.display()),
            Err(e) => error!("{e}"),
        }
    }
}

pub fn run_directory_name(started: DateTime<Local>) -> String {
    started.format("%Y_%m_%d - %H_%M_%S").to_string()
}

/// Two-decimal percentage, or "n/a" when nothing was processed.
pub fn format_percent(ratio: Option<f64>) -> String {
    match ratio {
        Some(r) => format!("{:.2}%", r * 100.0),
        None => "n/a".to_string(),
    }
}

/// "1 day, 2 hours, 1 minute, 5 seconds"; zero-valued parts are left out.
pub fn readable_duration(elapsed: Duration) -> String {
    let total = elapsed.as_secs();
    let parts = [
        (total / 86_400, "day"),
        (total / 3_600 % 24, "hour"),
        (total / 60 % 60, "minute"),
        (total % 60, "second"),
    ];

    let rendered: Vec<String> = parts
        .iter()
        .filter(|(value, _)| *value > 0)
        .map(|(value, unit)| {
            let plural = if *value == 1 { "" } else { "s" };
            format!("{value} {unit}{plural}")
        })
        .collect();

    if rendered.is_empty() {
        "0 seconds".to_string()
    } else {
        rendered.join(", ")
    }
}
