use std::path::Path;

use log::{Level, debug, log_enabled};
use similar::TextDiff;

use crate::core::engine::traits::ReferenceMutator;
use crate::core::vcxproj::{compile_items, remove_span};
use crate::types::{FileReference, MutationError, MutationResult, Project};

/// Removes `ClCompile` entries from `.vcxproj` files in place.
pub struct VcxprojMutator;

impl VcxprojMutator {
    /// The project text with the first entry for `file` removed, or `None`
    /// when no entry matches exactly.
    pub fn without_reference(
        path: &Path,
        source: &str,
        file: &FileReference,
    ) -> Result<Option<String>, MutationError> {
        let items = compile_items(source).map_err(|e| MutationError::Malformed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        Ok(items
            .into_iter()
            .find(|item| item.include == file.as_str())
            .map(|item| remove_span(source, item.span)))
    }
}

impl ReferenceMutator for VcxprojMutator {
    async fn remove_reference(
        &self,
        project: &Project,
        file: &FileReference,
    ) -> Result<MutationResult, MutationError> {
        debug!("Removing reference to file from project...");
        let path = &project.path;
        let source = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| MutationError::Io {
                path: path.clone(),
                source,
            })?;

        let Some(mutated) = Self::without_reference(path, &source, file)? else {
            return Ok(MutationResult::NoMatch);
        };

        if log_enabled!(Level::Debug) {
            let diff = TextDiff::from_lines(&source, &mutated);
            debug!(
                "{}",
                diff.unified_diff()
                    .context_radius(2)
                    .header("pristine", "mutated")
            );
        }

        tokio::fs::write(path, mutated)
            .await
            .map_err(|source| MutationError::Io {
                path: path.clone(),
                source,
            })?;
        Ok(MutationResult::Removed)
    }
}
