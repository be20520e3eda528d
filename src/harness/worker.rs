use super::HarnessError;
use super::protocol::{WorkerMessage, WorkerRequest};
use crate::builder;
use crate::engine::{Engine, Event, LpEngine, Observer, StopToken};
use std::io::{self, Read, Write};
use tracing::{debug, info, warn};

/// Turn SIGINT into a stop request instead of terminating the process.
pub fn register_interrupt(stop: &StopToken) -> io::Result<()> {
    signal_hook::flag::register(signal_hook::consts::SIGINT, stop.flag())?;
    Ok(())
}

/// Forwards engine events to the caller. A caller that went away makes the
/// search pointless, so write failures request a stop.
struct Relay<'a, W: Write> {
    out: W,
    stop: &'a StopToken,
    failure: Option<io::Error>,
}

impl<W: Write> Relay<'_, W> {
    fn send(&mut self, message: &WorkerMessage) {
        if self.failure.is_some() {
            return;
        }
        if let Err(e) = message.write_to(&mut self.out) {
            warn!("cannot write to caller: {e}");
            self.stop.request_stop();
            self.failure = Some(e);
        }
    }
}

impl<W: Write> Observer for Relay<'_, W> {
    fn notify(&mut self, event: Event<'_>) {
        match event {
            Event::Log(line) => self.send(&WorkerMessage::Log {
                line: line.to_owned(),
            }),
            Event::Tier { index, priority } => self.send(&WorkerMessage::Tier { index, priority }),
            // JSON has no infinity; the caller's slots already start unbounded.
            Event::Progress { bound, objective } => {
                if bound.is_finite() {
                    self.send(&WorkerMessage::Bound { value: bound });
                }
                if objective.is_finite() {
                    self.send(&WorkerMessage::Objective { value: objective });
                }
            }
        }
    }
}

/// Body of the worker process: read one request from `input`, solve it and
/// stream messages to `output`. The solution (possibly none) is always sent;
/// the completed marker only when the search concluded.
pub fn run_worker(input: impl Read, output: impl Write, stop: &StopToken) -> Result<(), HarnessError> {
    let request: WorkerRequest = serde_json::from_reader(input).map_err(HarnessError::Request)?;
    let mut relay = Relay {
        out: output,
        stop,
        failure: None,
    };
    let model = match builder::build(&request.instance, &request.config.model) {
        Ok(model) => model,
        Err(e) => {
            relay.send(&WorkerMessage::Log {
                line: format!("invalid instance: {e}"),
            });
            return Err(e.into());
        }
    };
    let mut engine = LpEngine::new(&request.config.engine);
    let outcome = engine.solve(&model, &mut relay, stop)?;
    let termination = outcome.termination();
    info!(?termination, "search finished");
    relay.send(&WorkerMessage::Solution {
        solution: outcome.into_solution(),
    });
    match termination {
        Some(termination) => relay.send(&WorkerMessage::Completed { termination }),
        None => debug!("interrupted without incumbent"),
    }
    match relay.failure {
        Some(e) => Err(HarnessError::Io(e)),
        None => Ok(()),
    }
}
