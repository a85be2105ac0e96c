use std::fs;
use std::path::{Path, PathBuf};

use globset::GlobSet;
use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::core::vcxproj::compile_items;
use crate::types::{FileReference, Project, Solution, SolutionError};

// Project("{8BC9CEB8-8B4A-11D0-8D11-00A0C91BC942}") = "core", "src\core\core.vcxproj", "{...}"
static PROJECT_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*Project\("\{[^}]*\}"\)\s*=\s*"([^"]*)"\s*,\s*"([^"]*)"\s*,\s*"\{[^}]*\}""#)
        .expect("valid project line regex")
});

/// Reads a `.sln` (or a single `.vcxproj`) into a [`Solution`], keeping only
/// C++ projects and dropping those matched by `ignore`.
pub fn load_solution(path: &Path, ignore: &GlobSet) -> Result<Solution, SolutionError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    let project_paths = match extension.as_deref() {
        Some("sln") => {
            let text = read(path)?;
            solution_projects(path, &text)
        }
        Some("vcxproj") => vec![path.to_path_buf()],
        _ => return Err(SolutionError::Unsupported(path.to_path_buf())),
    };

    let mut projects = Vec::new();
    for project_path in project_paths {
        if ignore.is_match(&project_path) {
            info!("Ignoring project {}", project_path.display());
            continue;
        }
        projects.push(load_project(&project_path)?);
    }

    Solution::new(path.to_path_buf(), projects)
}

/// C++ project paths listed by a solution, resolved against its directory.
pub fn solution_projects(solution: &Path, text: &str) -> Vec<PathBuf> {
    let base = solution.parent().unwrap_or_else(|| Path::new("."));
    text.lines()
        .filter_map(|line| PROJECT_LINE.captures(line))
        .filter_map(|caps| {
            let relative = caps.get(2)?.as_str();
            if !relative.to_ascii_lowercase().ends_with(".vcxproj") {
                debug!("Skipping non C++ project entry {relative}");
                return None;
            }
            Some(resolve(base, relative))
        })
        .collect()
}

pub fn load_project(path: &Path) -> Result<Project, SolutionError> {
    let text = read(path)?;
    let files = compile_items(&text)
        .map_err(|e| SolutionError::Malformed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?
        .into_iter()
        .map(|item| FileReference::new(item.include))
        .collect();
    Ok(Project::new(path.to_path_buf(), files))
}

fn read(path: &Path) -> Result<String, SolutionError> {
    fs::read_to_string(path).map_err(|source| SolutionError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Joins a solution-relative path (either separator) onto `base`, folding
/// `.` and `..` so project directories compare cleanly with other paths.
fn resolve(base: &Path, relative: &str) -> PathBuf {
    let mut path = base.to_path_buf();
    for segment in relative.split(['\\', '/']) {
        match segment {
            "" | "." => {}
            ".." => {
                path.pop();
            }
            segment => path.push(segment),
        }
    }
    path
}
