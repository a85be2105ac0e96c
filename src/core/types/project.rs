use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::types::SolutionError;

/// A compiled-file entry exactly as written in the project's `Include` attribute.
///
/// This is never resolved against the project directory: the same string is
/// used to find the entry again when removing it and is what gets reported.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct FileReference(String);

impl FileReference {
    pub fn new(include: impl Into<String>) -> Self {
        Self(include.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FileReference {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Project {
    /// Path of the project definition; unique within a solution.
    pub path: PathBuf,
    /// Directory restored between perturbations.
    pub directory: PathBuf,
    /// File stem of the project definition, used for log and report names;
    /// made unique when the project joins a [`Solution`].
    pub name: String,
    pub files: Vec<FileReference>,
}

impl Project {
    pub fn new(path: PathBuf, files: Vec<FileReference>) -> Self {
        let directory = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        Self {
            path,
            directory,
            name,
            files,
        }
    }

    /// Returns a cwd-relative path string suitable for logging
    pub fn display(&self) -> String {
        if let Ok(cwd) = std::env::current_dir()
            && let Ok(relative) = self.path.strip_prefix(&cwd)
        {
            return relative.to_string_lossy().into_owned();
        }
        self.path.to_string_lossy().into_owned()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Solution {
    pub path: PathBuf,
    projects: Vec<Project>,
}

impl Solution {
    /// Rejects repeated project paths. Projects sharing a file stem get a
    /// numeric suffix (`core`, `core-2`) so log and report names never collide.
    pub fn new(path: PathBuf, mut projects: Vec<Project>) -> Result<Self, SolutionError> {
        let mut seen = HashSet::new();
        for project in &projects {
            if !seen.insert(project.path.clone()) {
                return Err(SolutionError::DuplicateProject(project.path.clone()));
            }
        }

        // Case-insensitive, as on the file systems the reports usually land on.
        let mut names = HashSet::new();
        for project in &mut projects {
            let mut name = project.name.clone();
            let mut suffix = 2;
            while !names.insert(name.to_lowercase()) {
                name = format!("{}-{suffix}", project.name);
                suffix += 1;
            }
            project.name = name;
        }

        Ok(Self { path, projects })
    }

    /// Projects in solution order.
    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn project_count(&self) -> usize {
        self.projects.len()
    }

    pub fn file_count(&self) -> usize {
        self.projects.iter().map(|p| p.files.len()).sum()
    }

    /// Drops every project for which `exclude` returns true, keeping order.
    pub fn without(mut self, mut exclude: impl FnMut(&Project) -> bool) -> Self {
        self.projects.retain(|p| !exclude(p));
        self
    }
}
