use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Local;
use log::{debug, warn};

use crate::core::engine::traits::{BuildOracle, ReferenceMutator, WorkspaceReverter};
use crate::core::report::ProgressReporter;
use crate::types::{
    AbortedProject, BaselineUnbuildable, BuildScope, BuildTarget, DeadFileReport, MutationError,
    MutationResult, PassError, Project, ProjectOutcome, ProjectProgress, RunState,
    RunStatistics, RunSummary, Solution,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct EngineOptions {
    pub scope: BuildScope,
    /// Abort the project when a reference cannot be found instead of
    /// building the unmodified project.
    pub strict_match: bool,
}

enum Pass {
    Finished,
    Interrupted,
}

/// Drives the remove, build, classify, revert cycle over every file of every
/// project, strictly one file at a time.
pub struct PerturbationEngine<B, W, M, R> {
    oracle: B,
    reverter: W,
    mutator: M,
    reporter: R,
    options: EngineOptions,
    running: Arc<AtomicBool>,
    state: RunState,
}

impl<B, W, M, R> PerturbationEngine<B, W, M, R>
where
    B: BuildOracle,
    W: WorkspaceReverter,
    M: ReferenceMutator,
    R: ProgressReporter,
{
    pub fn new(oracle: B, reverter: W, mutator: M, reporter: R, options: EngineOptions) -> Self {
        Self {
            oracle,
            reverter,
            mutator,
            reporter,
            options,
            running: Arc::new(AtomicBool::new(true)),
            state: RunState::NotStarted,
        }
    }

    /// Shares the Ctrl-C flag. It is only checked between files, so a build
    /// in flight always finishes and the project is still reverted.
    pub fn with_running_flag(mut self, running: Arc<AtomicBool>) -> Self {
        self.running = running;
        self
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub async fn run(&mut self, solution: &Solution) -> RunSummary {
        let stats = RunStatistics::new(solution.project_count(), solution.file_count());
        let mut summary = RunSummary::new(solution.path.clone(), stats);

        self.state = RunState::ProcessingProjects;
        summary.state = self.state;
        self.reporter.run_started(solution, &summary.stats);

        for (index, project) in solution.projects().iter().enumerate() {
            if !self.is_running() {
                summary.interrupted = true;
                break;
            }

            self.reporter.project_started(project, index + 1, &summary.stats);

            let outcome = match self
                .process_project(solution, project, &mut summary.stats)
                .await
            {
                Ok(outcome) => outcome,
                Err(unbuildable) => {
                    self.reporter.fatal(&unbuildable, &summary.stats);
                    summary.fatal = Some(unbuildable);
                    break;
                }
            };

            let progress =
                ProjectProgress::new(project.files.len(), outcome.report().dead_files.len());
            self.reporter
                .project_finished(project, &outcome, &progress, &summary.stats);

            let interrupted = matches!(outcome, ProjectOutcome::Interrupted(_));
            if let ProjectOutcome::Aborted { reason, file, .. } = &outcome {
                summary.aborted.push(AbortedProject {
                    project: project.path.clone(),
                    reason: reason.clone(),
                    file: file.clone(),
                });
            }
            let report = outcome.into_report();
            if !report.is_empty() {
                summary.reports.push(report);
            }
            if interrupted {
                summary.interrupted = true;
                break;
            }
        }

        self.state = RunState::Finished;
        summary.state = self.state;
        summary.finished_at = Some(Local::now());
        self.reporter.run_finished(&summary);
        summary
    }

    /// Classifies every file of one project.
    ///
    /// Only an unbuildable baseline is returned as an error; every other
    /// failure ends the project as [`ProjectOutcome::Aborted`] after the final
    /// revert, leaving the rest of the run unaffected.
    pub async fn process_project(
        &mut self,
        solution: &Solution,
        project: &Project,
        stats: &mut RunStatistics,
    ) -> Result<ProjectOutcome, BaselineUnbuildable> {
        let target = BuildTarget::new(self.options.scope, solution, project);
        let mut report = DeadFileReport::new(project);

        if let Err(e) = self.reverter.prepare(&project.directory).await {
            if let Err(revert_err) = self.reverter.revert(&project.directory).await {
                warn!("{}: {revert_err}", project.display());
            }
            stats.record_skipped_files(project.files.len());
            stats.record_project();
            return Ok(ProjectOutcome::Aborted {
                report,
                reason: PassError::Prepare(e).to_string(),
                file: None,
            });
        }

        debug!(
            "Verifying {} builds before perturbation",
            target.path().display()
        );
        let baseline = self.oracle.build(&target).await;
        if !baseline.verdict.is_success() {
            // Best effort: drop whatever the failed build left behind.
            if let Err(revert_err) = self.reverter.revert(&project.directory).await {
                warn!("{}: {revert_err}", project.display());
            }
            return Err(BaselineUnbuildable {
                project: project.path.clone(),
                log: baseline.log,
            });
        }
        self.reporter.baseline_verified(project, &baseline);

        let mut processed = 0;
        let pass = self
            .classify_files(project, &target, &mut report, &mut processed, stats)
            .await;

        // Unconditional, so the next project starts from a pristine tree.
        let final_revert = self
            .reverter
            .revert(&project.directory)
            .await
            .map_err(PassError::FinalRevert);

        let outcome = match (pass, final_revert) {
            (Ok(Pass::Finished), Ok(())) => ProjectOutcome::Completed(report),
            (Ok(Pass::Interrupted), Ok(())) => return Ok(ProjectOutcome::Interrupted(report)),
            (Err(e), final_revert) => {
                if let Err(revert_err) = final_revert {
                    warn!("{}: {revert_err}", project.display());
                }
                ProjectOutcome::Aborted {
                    report,
                    reason: e.to_string(),
                    file: e.file().cloned(),
                }
            }
            (Ok(_), Err(e)) => ProjectOutcome::Aborted {
                report,
                reason: e.to_string(),
                file: None,
            },
        };

        stats.record_skipped_files(project.files.len() - processed);
        stats.record_project();
        Ok(outcome)
    }

    async fn classify_files(
        &mut self,
        project: &Project,
        target: &BuildTarget,
        report: &mut DeadFileReport,
        processed: &mut usize,
        stats: &mut RunStatistics,
    ) -> Result<Pass, PassError> {
        for (index, file) in project.files.iter().enumerate() {
            if !self.is_running() {
                return Ok(Pass::Interrupted);
            }
            self.reporter.file_started(project, file, index + 1);

            self.reverter
                .revert(&project.directory)
                .await
                .map_err(|source| PassError::Revert {
                    file: file.clone(),
                    source,
                })?;

            let mutation = self
                .mutator
                .remove_reference(project, file)
                .await
                .map_err(|source| PassError::Mutation {
                    file: file.clone(),
                    source,
                })?;

            if mutation == MutationResult::NoMatch {
                if self.options.strict_match {
                    return Err(PassError::Mutation {
                        file: file.clone(),
                        source: MutationError::NoMatch {
                            path: project.path.clone(),
                            file: file.clone(),
                        },
                    });
                }
                warn!(
                    "No ClCompile entry for {file} in {}; building the unmodified project",
                    project.display()
                );
            }

            let outcome = self.oracle.build(target).await;
            let dead = outcome.verdict.is_success();
            if dead {
                report.dead_files.push(file.clone());
            }
            stats.record_file(dead);
            *processed += 1;

            self.reporter.file_classified(project, file, &outcome);
        }

        Ok(Pass::Finished)
    }
}
