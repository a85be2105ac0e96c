use serde::Serialize;

/// Run-wide counters. Totals are captured once when the run starts; the
/// counters only ever grow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStatistics {
    pub projects_to_process: usize,
    pub files_to_process: usize,
    projects_completed: usize,
    files_completed: usize,
    dead_files_found: usize,
}

impl RunStatistics {
    pub fn new(projects_to_process: usize, files_to_process: usize) -> Self {
        Self {
            projects_to_process,
            files_to_process,
            ..Self::default()
        }
    }

    pub fn projects_completed(&self) -> usize {
        self.projects_completed
    }

    pub fn files_completed(&self) -> usize {
        self.files_completed
    }

    pub fn dead_files_found(&self) -> usize {
        self.dead_files_found
    }

    pub(crate) fn record_file(&mut self, dead: bool) {
        self.files_completed += 1;
        if dead {
            self.dead_files_found += 1;
        }
    }

    /// Files abandoned by an aborted project still count as done.
    pub(crate) fn record_skipped_files(&mut self, count: usize) {
        self.files_completed += count;
    }

    pub(crate) fn record_project(&mut self) {
        self.projects_completed += 1;
    }

    /// Dead files as a fraction of files processed so far.
    pub fn dead_ratio(&self) -> Option<f64> {
        ratio(self.dead_files_found, self.files_completed)
    }

    pub fn project_progress(&self) -> Option<f64> {
        ratio(self.projects_completed, self.projects_to_process)
    }

    pub fn file_progress(&self) -> Option<f64> {
        ratio(self.files_completed, self.files_to_process)
    }
}

/// Figures for a single project pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProjectProgress {
    pub files_total: usize,
    pub dead_files: usize,
}

impl ProjectProgress {
    pub fn new(files_total: usize, dead_files: usize) -> Self {
        Self {
            files_total,
            dead_files,
        }
    }

    pub fn dead_ratio(&self) -> Option<f64> {
        ratio(self.dead_files, self.files_total)
    }
}

/// `None` stands for "nothing processed", never a division by zero.
pub fn ratio(numerator: usize, denominator: usize) -> Option<f64> {
    if denominator == 0 {
        None
    } else {
        Some(numerator as f64 / denominator as f64)
    }
}
