use std::time::Duration;

use maplit::btreemap;

use cpst_core::action::{self, CaseFilter};
use cpst_core::orchestrator::{Orchestrator, SessionOutcome};
use cpst_core::report::ProgressEvent;
use cpst_core::storage::{RunId, SolutionName};
use cpst_core::testing::{CaseOutcome, CaseStatus, CaseVerdict, ExecLimits};

use testenv::{CopyCompiler, RecordingReporter, TestEnv};

/// Doubles the input, except for multiples of 3.
const SOMETIMES_WRONG: &str = r#"read n
if [ $((n % 3)) -eq 0 ]; then echo $((n * 2 + 1)); else echo $((n * 2)); fi"#;

const CORRECT: &str = r#"read n
echo $((n * 2))"#;

fn env_with(solution: &str) -> TestEnv {
    let env = TestEnv::new();
    env.counting_generator();
    env.doubling_checker();
    env.solution(solution);
    env
}

fn solution_name() -> SolutionName {
    SolutionName::new("solution.cpp")
}

#[tokio::test]
async fn run_persists_every_case_and_summarizes() {
    let env = env_with(SOMETIMES_WRONG);
    let (compiler, executor, reporter) = testenv::collaborators();
    let f = &env.files;

    let outcome = Orchestrator::new(&env.store, &compiler, &executor, &reporter)
        .run(&f.solution, &f.generator, &f.checker, 6)
        .await
        .unwrap();

    let SessionOutcome::Completed { run_id: Some(run_id), histogram } = outcome.clone() else {
        panic!("unexpected outcome {:?}", outcome)
    };
    assert_eq!(histogram.total(), 6);
    assert_eq!(
        histogram.iter().collect::<std::collections::BTreeMap<_, _>>(),
        btreemap! { CaseStatus::OK => 4, CaseStatus::WA => 2 }
    );

    let stored = env.store.list_results(&run_id);
    assert_eq!(stored.iter().map(|v| v.case_no).collect::<Vec<_>>(), [1, 2, 3, 4, 5, 6]);
    let wa = &stored[2];
    assert_eq!(wa.status, CaseStatus::WA);
    assert_eq!(wa.input.as_deref(), Some("3\n"));
    assert_eq!(wa.output.as_deref(), Some("7\n"));
    assert_eq!(wa.reason.as_deref(), Some("expected 6, got 7\n"));
    assert_eq!(wa.memory_kb, Some(0));

    assert_eq!(env.store.list_runs(&solution_name()), [run_id]);
    assert!(!env.store.temp_dir().exists());
    assert_eq!(
        *compiler.compiled.lock().unwrap(),
        [f.solution.clone(), f.generator.clone(), f.checker.clone()]
    );

    // Running i, Finished i for every case, then one summary.
    let events = reporter.events();
    assert_eq!(events.len(), 6 * 2 + 1);
    for (i, pair) in events[..12].chunks(2).enumerate() {
        let case_no = i as u32 + 1;
        assert_eq!(pair[0], ProgressEvent::Running { run_id: None, test_case: case_no });
        assert!(matches!(
            &pair[1],
            ProgressEvent::Finished { verdict, .. } if verdict.case_no == case_no
        ));
    }
    assert_eq!(events[12], ProgressEvent::Summary { summary: histogram });
    assert_eq!(*reporter.started.lock().unwrap(), 1);
}

#[tokio::test]
async fn zero_cases_still_creates_the_run() {
    let env = env_with(CORRECT);
    let (compiler, executor, reporter) = testenv::collaborators();
    let f = &env.files;

    let outcome = Orchestrator::new(&env.store, &compiler, &executor, &reporter)
        .run(&f.solution, &f.generator, &f.checker, 0)
        .await
        .unwrap();

    let run_id = outcome.run_id().cloned().unwrap();
    assert_eq!(outcome.histogram().map(|h| h.total()), Some(0));
    assert!(env.store.list_results(&run_id).is_empty());
    assert_eq!(reporter.events().len(), 1);
}

#[tokio::test]
async fn failing_cases_do_not_stop_the_session() {
    let env = env_with("read n\nsleep 5");
    let (compiler, executor, reporter) = testenv::collaborators();
    let f = &env.files;

    let outcome = Orchestrator::new(&env.store, &compiler, &executor, &reporter)
        .limits(ExecLimits {
            timeout: Duration::from_millis(300),
            ..Default::default()
        })
        .run(&f.solution, &f.generator, &f.checker, 2)
        .await
        .unwrap();

    let run_id = outcome.run_id().cloned().unwrap();
    assert_eq!(outcome.histogram().unwrap().get(CaseStatus::TLE), 2);
    for (i, v) in env.store.list_results(&run_id).iter().enumerate() {
        assert_eq!(v.status, CaseStatus::TLE);
        assert_eq!(v.input, Some(format!("{}\n", i + 1)));
        assert_eq!(v.output, None);
    }
}

#[tokio::test]
async fn compile_failure_is_reported_once_and_cleans_up() {
    let env = env_with(CORRECT);
    let compiler = CopyCompiler {
        reject: Some(env.files.generator.clone()),
        ..Default::default()
    };
    let (executor, reporter) = (TestEnv::executor(), RecordingReporter::default());
    let f = &env.files;

    let outcome = Orchestrator::new(&env.store, &compiler, &executor, &reporter)
        .run(&f.solution, &f.generator, &f.checker, 5)
        .await
        .unwrap();

    assert!(matches!(outcome, SessionOutcome::CompileFailed { run_id: Some(_) }));
    assert_eq!(compiler.compiled.lock().unwrap().len(), 2, "checker must not be compiled");
    assert!(reporter.events().is_empty());
    assert!(env.store.list_results(outcome.run_id().unwrap()).is_empty());
    assert!(!env.store.temp_dir().exists());
}

#[tokio::test]
async fn rerun_updates_only_the_selected_cases() {
    let env = env_with(SOMETIMES_WRONG);
    let (compiler, executor, reporter) = testenv::collaborators();
    let f = &env.files;
    let orchestrator = Orchestrator::new(&env.store, &compiler, &executor, &reporter);

    let first = orchestrator.run(&f.solution, &f.generator, &f.checker, 3).await.unwrap();
    let second = orchestrator.run(&f.solution, &f.generator, &f.checker, 6).await.unwrap();
    let (r1, r2) = (first.run_id().cloned().unwrap(), second.run_id().cloned().unwrap());
    assert_ne!(r1, r2);

    let snapshot = |id: &RunId| {
        (1..=6)
            .map(|n| fsutil::read_to_string(env.store.result_file(id, n)).ok())
            .collect::<Vec<_>>()
    };
    let (before1, before2) = (snapshot(&r1), snapshot(&r2));

    // Second run saw inputs 4..=9, so its failures are cases 3 (input 6) and 6 (input 9).
    let failed = CaseFilter {
        failed_only: true,
        ..Default::default()
    };
    let runs = [r1.clone(), r2.clone()];
    let selection = action::select_cases(&env.store, &solution_name(), &runs, &failed).unwrap();
    assert_eq!(selection[&r1].iter().map(|v| v.case_no).collect::<Vec<_>>(), [3]);
    assert_eq!(selection[&r2].iter().map(|v| v.case_no).collect::<Vec<_>>(), [3, 6]);

    env.solution(CORRECT);
    reporter.events.lock().unwrap().clear();
    let outcome = orchestrator.rerun(&f.solution, &f.checker, &selection).await.unwrap();

    assert_eq!(outcome.run_id(), None);
    assert_eq!(outcome.histogram().unwrap().get(CaseStatus::OK), 3);
    assert_eq!(outcome.histogram().unwrap().total(), 3);

    let (after1, after2) = (snapshot(&r1), snapshot(&r2));
    for n in 0..6 {
        let touched1 = n == 2;
        let touched2 = n == 2 || n == 5;
        assert_eq!(after1[n] == before1[n], !touched1, "run 1 case {}", n + 1);
        assert_eq!(after2[n] == before2[n], !touched2, "run 2 case {}", n + 1);
    }
    let replayed = env.store.read_result(&r2, 6).unwrap();
    assert_eq!(replayed.status, CaseStatus::OK);
    assert_eq!(replayed.input.as_deref(), Some("9\n"));
    assert_eq!(replayed.output.as_deref(), Some("18\n"));
    assert_eq!(replayed.reason, None);

    // The generator is not part of a replay.
    assert!(!compiler.compiled.lock().unwrap()[6..].contains(&f.generator));
    assert!(matches!(
        &reporter.events()[0],
        ProgressEvent::Running { run_id: Some(id), test_case: 3 } if *id == r1
    ));
    assert!(!env.store.temp_dir().exists());
}

#[tokio::test]
async fn rerun_of_an_unknown_run_still_writes_its_case() {
    let env = env_with(CORRECT);
    let (compiler, executor, reporter) = testenv::collaborators();
    let f = &env.files;

    let ghost: RunId = "ghost".parse().unwrap();
    let stored = CaseVerdict {
        input: Some("5\n".to_owned()),
        ..CaseVerdict::new(4, CaseOutcome::error("lost"))
    };
    let selection = btreemap! { ghost.clone() => vec![stored] };
    assert!(!env.store.run_dir(&ghost).exists());

    let outcome = Orchestrator::new(&env.store, &compiler, &executor, &reporter)
        .rerun(&f.solution, &f.checker, &selection)
        .await
        .unwrap();

    assert_eq!(outcome.histogram().unwrap().get(CaseStatus::OK), 1);
    let stored = env.store.list_results(&ghost);
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].case_no, 4);
    assert_eq!(stored[0].status, CaseStatus::OK);
    assert_eq!(stored[0].output.as_deref(), Some("10\n"));
    assert!(env.store.list_solutions().is_empty());
}

#[tokio::test]
async fn deleting_a_solution_removes_all_of_its_runs() {
    let env = env_with(CORRECT);
    let (compiler, executor, reporter) = testenv::collaborators();
    let f = &env.files;
    let orchestrator = Orchestrator::new(&env.store, &compiler, &executor, &reporter);

    let mut runs = Vec::new();
    for _ in 0..2 {
        let o = orchestrator.run(&f.solution, &f.generator, &f.checker, 2).await.unwrap();
        runs.push(o.run_id().cloned().unwrap());
    }
    assert_eq!(env.store.list_runs(&solution_name()), runs);

    action::delete_solution(&env.store, &reporter, &solution_name()).unwrap();
    assert!(env.store.list_runs(&solution_name()).is_empty());
    assert!(env.store.list_solutions().is_empty());
    for id in &runs {
        assert!(!env.store.run_dir(id).exists());
        assert!(env.store.list_results(id).is_empty());
    }
    assert_eq!(*reporter.cleared.lock().unwrap(), 1);
}
