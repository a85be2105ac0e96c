mod common;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use maggot::types::{BuildVerdict, FileReference, RunState};
use maggot::{EngineOptions, PerturbationEngine};
use pretty_assertions::assert_eq;

use common::{
    Call, FakeMutator, FakeOracle, FakeReverter, RecordingReporter, calls, project, solution,
    workspace,
};

fn refs(files: &[&str]) -> Vec<FileReference> {
    files.iter().map(|f| FileReference::new(*f)).collect()
}

fn dir(name: &str) -> PathBuf {
    PathBuf::from("/ws").join(name)
}

#[tokio::test]
async fn two_project_scenario() {
    let sln = solution(vec![
        project("A", &["a1.cc", "a2.cc"]),
        project("B", &["b1.cc"]),
    ]);
    let ws = workspace(&sln);
    let oracle = FakeOracle::new(&ws, |dir: &Path, files: &[String]| {
        let complete = if dir.ends_with("A") {
            files.len() == 2 || files == ["a1.cc"]
        } else {
            files.len() == 1
        };
        if complete {
            BuildVerdict::Success
        } else {
            BuildVerdict::Failure
        }
    });

    let mut engine = PerturbationEngine::new(
        oracle,
        FakeReverter::new(&ws),
        FakeMutator::new(&ws),
        RecordingReporter::default(),
        EngineOptions::default(),
    );
    assert_eq!(engine.state(), RunState::NotStarted);

    let summary = engine.run(&sln).await;

    assert_eq!(engine.state(), RunState::Finished);
    assert_eq!(summary.state, RunState::Finished);
    assert!(summary.fatal.is_none());
    assert_eq!(summary.reports.len(), 1);
    assert_eq!(summary.reports[0].project, dir("A").join("A.vcxproj"));
    assert_eq!(summary.reports[0].dead_files, refs(&["a2.cc"]));
    assert_eq!(summary.stats.projects_completed(), 2);
    assert_eq!(summary.stats.files_completed(), 3);
    assert_eq!(summary.stats.dead_files_found(), 1);
    assert!(engine.reporter().finished);
}

#[tokio::test]
async fn only_the_prunable_file_is_reported() {
    let files = ["main.cc", "parser.cc", "legacy.cc", "util.cc", "io.cc"];
    let sln = solution(vec![project("core", &files)]);
    let ws = workspace(&sln);
    let oracle = FakeOracle::new(&ws, |_: &Path, current: &[String]| {
        let required = ["main.cc", "parser.cc", "util.cc", "io.cc"];
        if required.iter().all(|r| current.iter().any(|f| f == r)) {
            BuildVerdict::Success
        } else {
            BuildVerdict::Failure
        }
    });

    let mut engine = PerturbationEngine::new(
        oracle,
        FakeReverter::new(&ws),
        FakeMutator::new(&ws),
        (),
        EngineOptions::default(),
    );
    let summary = engine.run(&sln).await;

    assert_eq!(summary.reports.len(), 1);
    assert_eq!(summary.reports[0].dead_files, refs(&["legacy.cc"]));
    assert_eq!(summary.stats.files_completed(), files.len());
}

#[tokio::test]
async fn unbuildable_baseline_halts_the_run() {
    let sln = solution(vec![project("A", &["a1.cc"]), project("B", &["b1.cc"])]);
    let ws = workspace(&sln);
    let oracle = FakeOracle::new(&ws, |_: &Path, _: &[String]| BuildVerdict::Failure);

    let mut engine = PerturbationEngine::new(
        oracle,
        FakeReverter::new(&ws),
        FakeMutator::new(&ws),
        RecordingReporter::default(),
        EngineOptions::default(),
    );
    let summary = engine.run(&sln).await;

    let fatal = summary.fatal.as_ref().expect("run should be fatal");
    assert_eq!(fatal.project, dir("A").join("A.vcxproj"));
    assert!(summary.reports.is_empty());
    assert_eq!(summary.state, RunState::Finished);
    assert_eq!(engine.reporter().fatal.len(), 1);

    let calls = calls(&ws);
    assert!(!calls.iter().any(|c| matches!(c, Call::Remove(..))));
    assert_eq!(
        calls.iter().filter(|c| matches!(c, Call::Build(_))).count(),
        1
    );
    // The failed baseline's output is still cleaned up.
    assert_eq!(calls.last(), Some(&Call::Revert(dir("A"))));
    assert!(!calls.contains(&Call::Prepare(dir("B"))));
    assert_eq!(summary.stats.projects_completed(), 0);
}

#[tokio::test]
async fn failing_mutation_aborts_only_its_project() {
    let sln = solution(vec![
        project("A", &["a1.cc", "a2.cc", "a3.cc"]),
        project("B", &["b1.cc", "b2.cc"]),
    ]);
    let ws = workspace(&sln);
    // Everything is dead: any build succeeds.
    let oracle = FakeOracle::new(&ws, |_: &Path, _: &[String]| BuildVerdict::Success);
    let mut mutator = FakeMutator::new(&ws);
    mutator.fail_on = Some("a2.cc".to_string());

    let mut engine = PerturbationEngine::new(
        oracle,
        FakeReverter::new(&ws),
        mutator,
        RecordingReporter::default(),
        EngineOptions::default(),
    );
    let summary = engine.run(&sln).await;

    assert_eq!(summary.aborted.len(), 1);
    let aborted = &summary.aborted[0];
    assert_eq!(aborted.project, dir("A").join("A.vcxproj"));
    assert_eq!(aborted.file, Some(FileReference::new("a2.cc")));

    // a1.cc was classified before the failure and stays classified.
    assert_eq!(summary.reports.len(), 2);
    assert_eq!(summary.reports[0].dead_files, refs(&["a1.cc"]));
    assert_eq!(summary.reports[1].dead_files, refs(&["b1.cc", "b2.cc"]));

    // The failing project is still reverted before B starts.
    let calls = calls(&ws);
    let b_prepare = calls
        .iter()
        .position(|c| *c == Call::Prepare(dir("B")))
        .unwrap();
    assert_eq!(calls[b_prepare - 1], Call::Revert(dir("A")));
    assert!(!calls.contains(&Call::Remove(dir("A"), "a3.cc".to_string())));

    // Counters still reach the totals.
    assert_eq!(summary.stats.projects_completed(), 2);
    assert_eq!(summary.stats.files_completed(), 5);
    assert_eq!(summary.stats.dead_files_found(), 3);
    assert_eq!(engine.reporter().aborted, vec!["A".to_string()]);
}

#[tokio::test]
async fn revert_failure_leaves_the_file_unclassified() {
    let sln = solution(vec![
        project("A", &["a1.cc", "a2.cc"]),
        project("B", &["b1.cc"]),
    ]);
    let ws = workspace(&sln);
    let oracle = FakeOracle::new(&ws, |_: &Path, _: &[String]| BuildVerdict::Success);
    let mut reverter = FakeReverter::new(&ws);
    // Second revert of A happens right before a2.cc is mutated.
    reverter.fail_on = Some((dir("A"), 1));

    let mut engine = PerturbationEngine::new(
        oracle,
        reverter,
        FakeMutator::new(&ws),
        RecordingReporter::default(),
        EngineOptions::default(),
    );
    let summary = engine.run(&sln).await;

    let classified: Vec<_> = engine
        .reporter()
        .classified
        .iter()
        .map(|(f, _)| f.as_str())
        .collect();
    assert_eq!(classified, vec!["a1.cc", "b1.cc"]);
    assert_eq!(summary.aborted.len(), 1);
    assert_eq!(summary.aborted[0].file, Some(FileReference::new("a2.cc")));
    assert_eq!(summary.stats.files_completed(), 3);
    assert_eq!(summary.stats.dead_files_found(), 2);
}

#[tokio::test]
async fn missing_reference_builds_the_unmodified_project() {
    // ghost.cc is listed in memory but not present in the project on disk.
    let sln = solution(vec![project("A", &["a1.cc", "ghost.cc"])]);
    let ws = workspace(&sln);
    ws.lock()
        .unwrap()
        .pristine
        .insert(dir("A"), vec!["a1.cc".to_string()]);
    let oracle = FakeOracle::new(&ws, |_: &Path, files: &[String]| {
        if files.iter().any(|f| f == "a1.cc") {
            BuildVerdict::Success
        } else {
            BuildVerdict::Failure
        }
    });

    let mut engine = PerturbationEngine::new(
        oracle,
        FakeReverter::new(&ws),
        FakeMutator::new(&ws),
        (),
        EngineOptions::default(),
    );
    let summary = engine.run(&sln).await;

    assert!(summary.aborted.is_empty());
    assert_eq!(summary.reports[0].dead_files, refs(&["ghost.cc"]));
    let built = ws.lock().unwrap().built.clone();
    assert_eq!(built.last().unwrap().1, vec!["a1.cc".to_string()]);
}

#[tokio::test]
async fn strict_matching_turns_a_missing_reference_into_an_abort() {
    let sln = solution(vec![project("A", &["ghost.cc", "a1.cc"])]);
    let ws = workspace(&sln);
    ws.lock()
        .unwrap()
        .pristine
        .insert(dir("A"), vec!["a1.cc".to_string()]);
    let oracle = FakeOracle::new(&ws, |_: &Path, _: &[String]| BuildVerdict::Success);

    let mut engine = PerturbationEngine::new(
        oracle,
        FakeReverter::new(&ws),
        FakeMutator::new(&ws),
        (),
        EngineOptions {
            strict_match: true,
            ..EngineOptions::default()
        },
    );
    let summary = engine.run(&sln).await;

    assert!(summary.reports.is_empty());
    assert_eq!(summary.aborted.len(), 1);
    assert!(summary.aborted[0].reason.contains("ghost.cc"));
    // Only the baseline build ran.
    assert_eq!(ws.lock().unwrap().built.len(), 1);
    assert_eq!(summary.stats.files_completed(), 2);
}

#[tokio::test]
async fn every_build_sees_exactly_one_reference_missing() {
    let files = ["a.cc", "b.cc", "c.cc", "d.cc"];
    let sln = solution(vec![project("A", &files)]);
    let ws = workspace(&sln);
    let oracle = FakeOracle::new(&ws, |_: &Path, current: &[String]| {
        if current.len() % 2 == 0 {
            BuildVerdict::Success
        } else {
            BuildVerdict::Failure
        }
    });

    let mut engine = PerturbationEngine::new(
        oracle,
        FakeReverter::new(&ws),
        FakeMutator::new(&ws),
        (),
        EngineOptions::default(),
    );
    engine.run(&sln).await;

    let ws = ws.lock().unwrap();
    let perturbed: Vec<_> = ws.built.iter().skip(1).map(|(_, f)| f.clone()).collect();
    assert_eq!(perturbed.len(), files.len());
    for (removed, seen) in files.iter().zip(&perturbed) {
        let expected: Vec<String> = files
            .iter()
            .filter(|f| *f != removed)
            .map(|f| f.to_string())
            .collect();
        assert_eq!(seen, &expected);
    }
    // Final revert leaves the project as it started.
    assert_eq!(ws.current[&dir("A")], ws.pristine[&dir("A")]);
}

#[tokio::test]
async fn counters_never_decrease() {
    let sln = solution(vec![
        project("A", &["a1.cc", "a2.cc"]),
        project("B", &[]),
        project("C", &["c1.cc", "c2.cc", "c3.cc"]),
    ]);
    let ws = workspace(&sln);
    let oracle = FakeOracle::new(&ws, |_: &Path, _: &[String]| BuildVerdict::Success);
    let mut mutator = FakeMutator::new(&ws);
    mutator.fail_on = Some("c2.cc".to_string());

    let mut engine = PerturbationEngine::new(
        oracle,
        FakeReverter::new(&ws),
        mutator,
        RecordingReporter::default(),
        EngineOptions::default(),
    );
    let summary = engine.run(&sln).await;

    let snapshots = &engine.reporter().project_stats;
    assert_eq!(snapshots.len(), 3);
    for pair in snapshots.windows(2) {
        assert!(pair[1].files_completed() >= pair[0].files_completed());
        assert!(pair[1].projects_completed() >= pair[0].projects_completed());
        assert!(pair[1].dead_files_found() >= pair[0].dead_files_found());
    }
    assert_eq!(summary.stats.projects_completed(), 3);
    assert_eq!(summary.stats.files_completed(), 5);

    // The empty project has no defined dead ratio.
    assert_eq!(engine.reporter().progress[1].dead_ratio(), None);
}

#[tokio::test]
async fn interrupted_run_does_no_work() {
    let sln = solution(vec![project("A", &["a1.cc"])]);
    let ws = workspace(&sln);
    let oracle = FakeOracle::new(&ws, |_: &Path, _: &[String]| BuildVerdict::Success);

    let mut engine = PerturbationEngine::new(
        oracle,
        FakeReverter::new(&ws),
        FakeMutator::new(&ws),
        RecordingReporter::default(),
        EngineOptions::default(),
    )
    .with_running_flag(Arc::new(AtomicBool::new(false)));
    let summary = engine.run(&sln).await;

    assert!(summary.interrupted);
    assert!(calls(&ws).is_empty());
    assert_eq!(summary.state, RunState::Finished);
    assert!(engine.reporter().finished);
}

#[tokio::test]
async fn interrupt_mid_project_reverts_and_stops() {
    let sln = solution(vec![
        project("A", &["a1.cc", "a2.cc", "a3.cc"]),
        project("B", &["b1.cc"]),
    ]);
    let ws = workspace(&sln);
    let running = Arc::new(AtomicBool::new(true));
    let builds = AtomicUsize::new(0);
    let flag = Arc::clone(&running);
    // Ctrl-C arrives while a1.cc is being built (baseline is build 0).
    let oracle = FakeOracle::new(&ws, move |_: &Path, _: &[String]| {
        if builds.fetch_add(1, Ordering::SeqCst) == 1 {
            flag.store(false, Ordering::SeqCst);
        }
        BuildVerdict::Success
    });

    let mut engine = PerturbationEngine::new(
        oracle,
        FakeReverter::new(&ws),
        FakeMutator::new(&ws),
        RecordingReporter::default(),
        EngineOptions::default(),
    )
    .with_running_flag(running);
    let summary = engine.run(&sln).await;

    assert!(summary.interrupted);
    assert_eq!(summary.state, RunState::Finished);
    assert_eq!(summary.reports.len(), 1);
    assert_eq!(summary.reports[0].dead_files, refs(&["a1.cc"]));

    let calls = calls(&ws);
    assert_eq!(calls.last(), Some(&Call::Revert(dir("A"))));
    assert!(!calls.contains(&Call::Remove(dir("A"), "a2.cc".to_string())));
    assert!(!calls.contains(&Call::Prepare(dir("B"))));
    let ws = ws.lock().unwrap();
    assert_eq!(ws.current[&dir("A")], ws.pristine[&dir("A")]);

    assert_eq!(summary.stats.files_completed(), 1);
    assert_eq!(summary.stats.dead_files_found(), 1);
    assert_eq!(summary.stats.projects_completed(), 0);
    assert!(engine.reporter().finished);
}
