//! Contracts for the collaborators driven by the perturbation engine.
//!
//! The engine is generic over these traits, so each one can be swapped
//! independently: an in-process build and an external build tool, a VCS
//! revert and a pristine snapshot.

use std::path::Path;

use crate::types::{
    BuildOutcome, BuildTarget, FileReference, MutationError, MutationResult, Project, RevertError,
};

/// "Does this build right now?"
#[allow(async_fn_in_trait)]
pub trait BuildOracle {
    /// Runs exactly one build. Anything short of a clean success, including
    /// the build tool failing to start, is reported as `Failure`.
    async fn build(&self, target: &BuildTarget) -> BuildOutcome;
}

/// Restores a project directory to its known-good state.
#[allow(async_fn_in_trait)]
pub trait WorkspaceReverter {
    /// Called once per project before its baseline build.
    async fn prepare(&self, _directory: &Path) -> Result<(), RevertError> {
        Ok(())
    }

    /// Idempotent. Undoes edits to tracked files and deletes anything created
    /// since the known-good state, build output included.
    async fn revert(&self, directory: &Path) -> Result<(), RevertError>;
}

/// Edits a project definition on disk.
#[allow(async_fn_in_trait)]
pub trait ReferenceMutator {
    /// Removes the first compile entry whose include path equals `file`
    /// and persists the change before returning.
    async fn remove_reference(
        &self,
        project: &Project,
        file: &FileReference,
    ) -> Result<MutationResult, MutationError>;
}
