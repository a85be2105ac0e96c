use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::types::{Project, Solution};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum BuildVerdict {
    Success,
    Failure,
}

impl BuildVerdict {
    pub fn is_success(self) -> bool {
        self == BuildVerdict::Success
    }
}

/// What a single build invocation compiles. Fixed for a whole run so that
/// verdicts stay comparable.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum BuildScope {
    #[default]
    Solution,
    Project,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildTarget {
    pub scope: BuildScope,
    pub solution: PathBuf,
    pub project: PathBuf,
    /// Run-scoped hint used to name build logs.
    pub log_name: String,
}

impl BuildTarget {
    pub fn new(scope: BuildScope, solution: &Solution, project: &Project) -> Self {
        Self {
            scope,
            solution: solution.path.clone(),
            project: project.path.clone(),
            log_name: project.name.clone(),
        }
    }

    /// The file handed to the build tool.
    pub fn path(&self) -> &Path {
        match self.scope {
            BuildScope::Solution => &self.solution,
            BuildScope::Project => &self.project,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutcome {
    pub verdict: BuildVerdict,
    /// Where the build tool output was written; never inspected by the engine.
    pub log: Option<PathBuf>,
    pub duration_ms: u64,
}

impl BuildOutcome {
    pub fn new(verdict: BuildVerdict) -> Self {
        Self {
            verdict,
            log: None,
            duration_ms: 0,
        }
    }
}

/// Result of asking the mutator to drop one reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum MutationResult {
    Removed,
    NoMatch,
}
