use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::types::{FileReference, HashError};

#[derive(Debug, Error)]
pub enum SolutionError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Malformed project file {path}: {message}")]
    Malformed { path: PathBuf, message: String },
    #[error("Project {0} appears more than once in the solution")]
    DuplicateProject(PathBuf),
    #[error("Unsupported input {0}: expected a .sln or .vcxproj file")]
    Unsupported(PathBuf),
}

#[derive(Debug, Error)]
pub enum RevertError {
    #[error("Failed to run `{command}` in {directory}: {source}")]
    Spawn {
        command: String,
        directory: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("`{command}` failed in {directory}: {stderr}")]
    Command {
        command: String,
        directory: PathBuf,
        stderr: String,
    },
    #[error("No snapshot recorded for {0}")]
    MissingSnapshot(PathBuf),
    #[error("Snapshot I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Snapshot content for {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: HashError,
    },
}

#[derive(Debug, Error)]
pub enum MutationError {
    #[error("Failed to access project file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Project file {path} is not well-formed: {message}")]
    Malformed { path: PathBuf, message: String },
    #[error("No ClCompile entry for {file} in {path}")]
    NoMatch { path: PathBuf, file: FileReference },
}

/// Failures that abandon the remainder of one project.
#[derive(Debug, Error)]
pub enum PassError {
    #[error("could not restore the workspace before testing {file}: {source}")]
    Revert {
        file: FileReference,
        #[source]
        source: RevertError,
    },
    #[error("could not remove the reference to {file}: {source}")]
    Mutation {
        file: FileReference,
        #[source]
        source: MutationError,
    },
    #[error("could not prepare the workspace: {0}")]
    Prepare(#[source] RevertError),
    #[error("could not restore the workspace after the project pass: {0}")]
    FinalRevert(#[source] RevertError),
}

impl PassError {
    /// The file under test when the failure happened, if any.
    pub fn file(&self) -> Option<&FileReference> {
        match self {
            PassError::Revert { file, .. } | PassError::Mutation { file, .. } => Some(file),
            PassError::Prepare(_) | PassError::FinalRevert(_) => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to serialize run summary: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Solution(#[from] SolutionError),
    #[error(transparent)]
    Report(#[from] ReportError),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Failed to install logger: {0}")]
    Logger(#[from] log::SetLoggerError),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("{0}")]
    Custom(String),
}

pub type AppResult<T> = Result<T, AppError>;
