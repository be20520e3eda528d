//! Out-of-process execution of a solve. The binary is re-run with the hidden
//! `worker` subcommand; the request goes through the worker's stdin and
//! messages come back on its stdout, where a relay thread dispatches them to
//! channels and to the progress cell polled by the caller.

pub use self::progress::{ProgressCell, progress};
pub use self::protocol::{WorkerMessage, WorkerRequest};
pub use self::worker::{register_interrupt, run_worker};

mod progress;
mod protocol;
mod worker;

use crate::config::Config;
use crate::engine::{EngineError, Termination};
use crate::model::{Instance, ModelError, Solution};
use std::cell::RefCell;
use std::io::{self, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender, channel};
use std::sync::{Arc, OnceLock};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, trace, warn};

const WORKER_SUBCOMMAND: &str = "worker";
const TEARDOWN_POLL: Duration = Duration::from_millis(10);

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("cannot locate the solver executable")]
    CurrentExe(#[source] io::Error),
    #[error("cannot spawn worker {program}")]
    Spawn {
        program: PathBuf,
        source: io::Error,
    },
    #[error("worker already started")]
    AlreadyStarted,
    #[error("malformed worker request")]
    Request(#[source] serde_json::Error),
    #[error("worker i/o failure")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// What became of a run, as far as the caller can tell.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Outcome {
    /// `start()` was not called yet.
    Pending,
    Running,
    /// Completed with an incumbent (`Optimal` or `Feasible`).
    Solved(Termination),
    /// Completed, and no assignment satisfies the hard constraints.
    Infeasible,
    /// The worker exited without a completed marker: interrupted before any
    /// incumbent, or crashed.
    Aborted { exit: Option<ExitStatus> },
}

#[derive(Debug, Default)]
struct Shared {
    progress: ProgressCell,
    completed: OnceLock<Termination>,
    drained: AtomicBool,
}

struct Channels {
    logs: Receiver<String>,
    solutions: Receiver<Option<Solution>>,
    /// Last solution message: `None` until one arrives, `Some(None)` when
    /// the worker reported that it has no incumbent.
    latest: RefCell<Option<Option<Solution>>>,
}

impl Channels {
    fn latest_solution(&self) -> Option<Solution> {
        let mut latest = self.latest.borrow_mut();
        for received in self.solutions.try_iter() {
            // A report without incumbent never hides an earlier solution.
            let has_solution = matches!(*latest, Some(Some(_)));
            if received.is_some() || !has_solution {
                *latest = Some(received);
            }
        }
        latest.clone().flatten()
    }
}

pub struct SolverProcess {
    request: WorkerRequest,
    program: Option<PathBuf>,
    shared: Arc<Shared>,
    child: Option<Child>,
    relay: Option<JoinHandle<()>>,
    channels: Option<Channels>,
    exit: Option<ExitStatus>,
    closed: bool,
}

impl SolverProcess {
    /// Structural errors in the instance are reported here, before any
    /// process is spawned.
    pub fn new(instance: Instance, config: Config) -> Result<SolverProcess, ModelError> {
        instance.validate()?;
        Ok(SolverProcess {
            request: WorkerRequest { instance, config },
            program: None,
            shared: Arc::default(),
            child: None,
            relay: None,
            channels: None,
            exit: None,
            closed: false,
        })
    }

    /// Executable run as the worker, `<program> worker`. Defaults to the
    /// current executable.
    pub fn with_program(mut self, program: impl AsRef<Path>) -> SolverProcess {
        self.program = Some(program.as_ref().to_owned());
        self
    }

    pub fn config(&self) -> &Config {
        &self.request.config
    }

    pub fn start(&mut self) -> Result<(), HarnessError> {
        if self.channels.is_some() {
            return Err(HarnessError::AlreadyStarted);
        }
        let program = match &self.program {
            Some(program) => program.clone(),
            None => std::env::current_exe().map_err(HarnessError::CurrentExe)?,
        };
        let mut child = Command::new(&program)
            .arg(WORKER_SUBCOMMAND)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()
            .map_err(|source| HarnessError::Spawn {
                program: program.clone(),
                source,
            })?;
        info!(pid = child.id(), program = %program.display(), "worker started");
        let (log_tx, logs) = channel();
        let (solution_tx, solutions) = channel();
        self.channels = Some(Channels {
            logs,
            solutions,
            latest: RefCell::default(),
        });
        if let Some(stdout) = child.stdout.take() {
            let shared = Arc::clone(&self.shared);
            self.relay = Some(thread::spawn(move || relay(stdout, &shared, log_tx, solution_tx)));
        } else {
            self.shared.drained.store(true, Ordering::Release);
        }
        let stdin = child.stdin.take();
        self.child = Some(child);
        if let Some(mut stdin) = stdin {
            let sent = serde_json::to_writer(&mut stdin, &self.request)
                .map_err(io::Error::from)
                .and_then(|()| stdin.flush());
            match sent {
                Ok(()) => (),
                // The worker died early: observable through `outcome()`.
                Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                    warn!("worker closed its input early");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// Whether the worker is alive or its messages are still being relayed.
    pub fn is_running(&mut self) -> bool {
        if self.closed || self.channels.is_none() {
            return false;
        }
        self.poll_exit();
        self.exit.is_none() || !self.shared.drained.load(Ordering::Acquire)
    }

    fn poll_exit(&mut self) {
        if self.exit.is_some() {
            return;
        }
        if let Some(child) = &mut self.child {
            match child.try_wait() {
                Ok(Some(status)) => {
                    debug!(%status, "worker exited");
                    self.exit = Some(status);
                }
                Ok(None) => (),
                Err(e) => warn!("cannot query worker status: {e}"),
            }
        }
    }

    /// Ask the worker to stop and return its incumbent. Returns immediately.
    pub fn interrupt(&mut self) -> Result<(), HarnessError> {
        self.poll_exit();
        if self.exit.is_some() {
            return Ok(());
        }
        let Some(child) = &mut self.child else {
            return Ok(());
        };
        info!(pid = child.id(), "interrupting worker");
        send_interrupt(child)?;
        Ok(())
    }

    /// Log lines received since the previous call, in order.
    pub fn get_log(&self) -> Vec<String> {
        let Some(channels) = &self.channels else {
            return Vec::new();
        };
        channels.logs.try_iter().collect()
    }

    /// The most recently received solution, or `None` if none has arrived
    /// yet. Repeated calls keep returning it.
    pub fn get_solution(&self) -> Option<Solution> {
        self.channels.as_ref()?.latest_solution()
    }

    /// Whether the worker sent its solution message, with or without an
    /// incumbent.
    pub fn is_solution_reported(&self) -> bool {
        self.channels.as_ref().is_some_and(|channels| {
            let _ = channels.latest_solution();
            channels.latest.borrow().is_some()
        })
    }

    pub fn get_current_bound(&self) -> f64 {
        self.shared.progress.bound()
    }

    pub fn get_current_objective_value(&self) -> f64 {
        self.shared.progress.objective()
    }

    /// Objective tier the bound and objective value refer to.
    pub fn current_tier(&self) -> Option<usize> {
        self.shared.progress.tier()
    }

    pub fn progress(&self) -> f64 {
        progress(self.get_current_bound(), self.get_current_objective_value())
    }

    /// Whether the worker sent its completed marker.
    pub fn is_completed(&self) -> bool {
        self.shared.completed.get().is_some()
    }

    pub fn termination(&self) -> Option<Termination> {
        self.shared.completed.get().copied()
    }

    pub fn outcome(&mut self) -> Outcome {
        if self.channels.is_none() {
            return Outcome::Pending;
        }
        if self.is_running() {
            return Outcome::Running;
        }
        match self.termination() {
            Some(Termination::Infeasible) => Outcome::Infeasible,
            Some(termination) => Outcome::Solved(termination),
            None => Outcome::Aborted { exit: self.exit },
        }
    }

    /// Stop the worker if needed and release everything. The worker is
    /// interrupted, given the grace period to exit, then killed. State
    /// remains queryable afterwards.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Some(mut child) = self.child.take() {
            if self.exit.is_none() {
                self.exit = shutdown(&mut child, self.request.config.harness.grace_period());
            }
        }
        if let Some(relay) = self.relay.take() {
            if relay.join().is_err() {
                warn!("relay thread panicked");
            }
        }
        self.shared.drained.store(true, Ordering::Release);
    }
}

impl Drop for SolverProcess {
    fn drop(&mut self) {
        self.close();
    }
}

fn shutdown(child: &mut Child, grace: Duration) -> Option<ExitStatus> {
    if let Ok(Some(status)) = child.try_wait() {
        return Some(status);
    }
    if let Err(e) = send_interrupt(child) {
        warn!("cannot interrupt worker: {e}");
    }
    let deadline = Instant::now() + grace;
    while Instant::now() < deadline {
        match child.try_wait() {
            Ok(Some(status)) => return Some(status),
            Ok(None) => thread::sleep(TEARDOWN_POLL),
            Err(_) => break,
        }
    }
    warn!(pid = child.id(), "worker did not stop in time, killing it");
    if let Err(e) = child.kill() {
        warn!("cannot kill worker: {e}");
    }
    child.wait().ok()
}

#[cfg(unix)]
fn send_interrupt(child: &mut Child) -> io::Result<()> {
    let pid = libc::pid_t::try_from(child.id())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    // SAFETY: `pid` is our own child, which has not been reaped yet.
    if unsafe { libc::kill(pid, libc::SIGINT) } == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn send_interrupt(child: &mut Child) -> io::Result<()> {
    child.kill()
}

fn relay(
    output: impl Read,
    shared: &Shared,
    logs: Sender<String>,
    solutions: Sender<Option<Solution>>,
) {
    let mut reader = BufReader::new(output);
    loop {
        let message = match WorkerMessage::read_from(&mut reader) {
            Ok(Some(message)) => message,
            Ok(None) => break,
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                warn!("ignoring malformed worker message: {e}");
                continue;
            }
            Err(e) => {
                warn!("cannot read from worker: {e}");
                break;
            }
        };
        trace!(?message, "worker message");
        // Send errors mean the caller dropped the harness.
        match message {
            WorkerMessage::Log { line } => {
                let _ = logs.send(line);
            }
            WorkerMessage::Bound { value } => shared.progress.set_bound(value),
            WorkerMessage::Objective { value } => shared.progress.set_objective(value),
            WorkerMessage::Tier { index, .. } => shared.progress.set_tier(index),
            WorkerMessage::Solution { solution } => {
                let _ = solutions.send(solution);
            }
            WorkerMessage::Completed { termination } => {
                if shared.completed.set(termination).is_err() {
                    warn!("duplicate completion from worker");
                }
            }
        }
    }
    debug!("worker output drained");
    shared.drained.store(true, Ordering::Release);
}
