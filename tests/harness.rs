use sepsolver::config::Config;
use sepsolver::engine::Termination;
use sepsolver::generator::{GeneratorParams, generate_seeded};
use sepsolver::harness::{Outcome, SolverProcess};
use sepsolver::model::{Instance, Project, ProjectId, Solution, Student, StudentId};
use std::thread;
use std::time::{Duration, Instant};

const WORKER: &str = env!("CARGO_BIN_EXE_sepsolver");
const TIMEOUT: Duration = Duration::from_secs(120);

/// Poll like an interactive caller until the worker is done.
fn run(process: &mut SolverProcess) -> (Vec<String>, Option<Solution>) {
    let started = Instant::now();
    let mut logs = Vec::new();
    while process.is_running() {
        assert!(started.elapsed() < TIMEOUT, "worker did not finish in time");
        logs.extend(process.get_log());
        thread::sleep(Duration::from_millis(20));
    }
    logs.extend(process.get_log());
    (logs, process.get_solution())
}

fn scenario_a() -> Instance {
    Instance::new(
        (1..=3)
            .map(|i| Student::new(StudentId(i)).preferring(&[ProjectId(1)]))
            .collect(),
        vec![Project::new(ProjectId(1), 1, 2, 3)],
        &[],
    )
}

#[test]
fn clean_run_streams_progress_and_completes() {
    let mut process = SolverProcess::new(scenario_a(), Config::default())
        .unwrap()
        .with_program(WORKER);
    assert_eq!(process.outcome(), Outcome::Pending);
    process.start().unwrap();
    let (logs, solution) = run(&mut process);
    assert!(!logs.is_empty());
    assert!(logs.iter().any(|line| line.contains("preference")));
    let solution = solution.expect("a solution");
    assert_eq!(solution.students_for(ProjectId(1)).len(), 3);
    assert_eq!(process.get_solution(), Some(solution.clone()));
    assert_eq!(process.get_solution(), Some(solution));
    assert!(process.is_solution_reported());
    assert!(process.is_completed());
    assert_eq!(process.termination(), Some(Termination::Optimal));
    assert_eq!(process.outcome(), Outcome::Solved(Termination::Optimal));
    assert_eq!(process.current_tier(), Some(5));
    assert!(process.get_current_bound().is_finite());
    assert_eq!(process.progress(), 1.0);
    assert!(!process.is_running());
    assert!(process.start().is_err());
}

#[test]
fn infeasible_run_completes_without_solution() {
    let instance = Instance::new(
        vec![Student::new(StudentId(1))],
        vec![Project::new(ProjectId(1), 2, 2, 2)],
        &[],
    );
    let mut process = SolverProcess::new(instance, Config::default())
        .unwrap()
        .with_program(WORKER);
    process.start().unwrap();
    let (_, solution) = run(&mut process);
    assert_eq!(solution, None);
    assert!(process.is_solution_reported());
    assert!(process.is_completed());
    assert_eq!(process.outcome(), Outcome::Infeasible);
}

#[test]
fn interrupted_run_has_no_solution_and_no_completion() {
    let params = GeneratorParams {
        students: 400,
        projects: 40,
        preferred: 5,
        disliked: 3,
        ..GeneratorParams::default()
    };
    let mut process = SolverProcess::new(generate_seeded(&params, 11), Config::default())
        .unwrap()
        .with_program(WORKER);
    process.start().unwrap();
    process.interrupt().unwrap();
    process.close();
    assert!(!process.is_running());
    assert_eq!(process.get_solution(), None);
    assert!(!process.is_completed());
    assert!(matches!(process.outcome(), Outcome::Aborted { .. }));
}

#[cfg(unix)]
#[test]
fn crashed_worker_is_aborted() {
    let mut process = SolverProcess::new(scenario_a(), Config::default())
        .unwrap()
        .with_program("false");
    process.start().unwrap();
    let (logs, solution) = run(&mut process);
    assert!(logs.is_empty());
    assert_eq!(solution, None);
    assert!(!process.is_completed());
    match process.outcome() {
        Outcome::Aborted { exit: Some(status) } => assert!(!status.success()),
        other => panic!("unexpected outcome {other:?}"),
    }
}

/// Start `process`, retrying while the freshly written script is still
/// reported busy by a concurrent fork.
#[cfg(unix)]
fn start_script(process: &mut SolverProcess) {
    use sepsolver::harness::HarnessError;
    for _ in 0..10 {
        match process.start() {
            Err(HarnessError::Spawn { source, .. })
                if source.raw_os_error() == Some(libc::ETXTBSY) =>
            {
                thread::sleep(Duration::from_millis(50));
            }
            result => return result.unwrap(),
        }
    }
    panic!("worker script stayed busy");
}

#[cfg(unix)]
#[test]
fn stubborn_worker_is_killed_after_grace_period() {
    use std::os::unix::fs::PermissionsExt;
    use std::os::unix::process::ExitStatusExt;

    let script = std::env::temp_dir().join(format!(
        "sepsolver-stubborn-worker-{}.sh",
        std::process::id()
    ));
    std::fs::write(&script, "#!/bin/sh\ntrap '' INT\nexec sleep 60\n").unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
    let mut config = Config::default();
    config.harness.grace_period_ms = 100;
    let mut process = SolverProcess::new(scenario_a(), config)
        .unwrap()
        .with_program(&script);
    start_script(&mut process);
    assert!(process.is_running());
    let started = Instant::now();
    process.close();
    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(!process.is_running());
    assert_eq!(process.get_solution(), None);
    match process.outcome() {
        Outcome::Aborted { exit: Some(status) } => {
            assert_eq!(status.signal(), Some(libc::SIGKILL));
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    std::fs::remove_file(&script).unwrap();
}
