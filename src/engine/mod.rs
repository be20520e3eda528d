//! Contract of the optimization engine driven by the harness, and its
//! `good_lp` implementation.

pub use self::lp::LpEngine;
pub use self::stop::StopToken;

mod lp;
mod stop;

use crate::builder::AssignmentModel;
use crate::model::Solution;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Notifications sent by an engine while it searches.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Event<'a> {
    Log(&'a str),
    /// A new objective tier is being optimized.
    Tier { index: usize, priority: u32 },
    /// Bound and incumbent value for the current tier.
    Progress { bound: f64, objective: f64 },
}

pub trait Observer {
    fn notify(&mut self, event: Event<'_>);
}

impl<F> Observer for F
where
    F: FnMut(Event<'_>),
{
    fn notify(&mut self, event: Event<'_>) {
        self(event)
    }
}

/// How a search concluded.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// Every tier was optimized.
    Optimal,
    /// Stopped early (request or time limit) with an incumbent.
    Feasible,
    /// No assignment satisfies the hard constraints.
    Infeasible,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Incumbent {
    pub solution: Solution,
    /// Value reached for each tier solved so far, highest priority first.
    pub tier_values: Vec<f64>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum EngineOutcome {
    Optimal(Incumbent),
    Feasible(Incumbent),
    Infeasible,
    /// Stopped before any incumbent was found.
    Interrupted,
}

impl EngineOutcome {
    pub fn termination(&self) -> Option<Termination> {
        match self {
            EngineOutcome::Optimal(_) => Some(Termination::Optimal),
            EngineOutcome::Feasible(_) => Some(Termination::Feasible),
            EngineOutcome::Infeasible => Some(Termination::Infeasible),
            EngineOutcome::Interrupted => None,
        }
    }

    pub fn incumbent(&self) -> Option<&Incumbent> {
        match self {
            EngineOutcome::Optimal(incumbent) | EngineOutcome::Feasible(incumbent) => {
                Some(incumbent)
            }
            _ => None,
        }
    }

    pub fn into_solution(self) -> Option<Solution> {
        match self {
            EngineOutcome::Optimal(incumbent) | EngineOutcome::Feasible(incumbent) => {
                Some(incumbent.solution)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("solver failure: {0}")]
    Solver(String),
    #[error("objective is unbounded in tier {tier}")]
    Unbounded { tier: usize },
}

/// Given the variables, constraints and prioritized objective of a model,
/// search for an assignment, honoring stop requests between steps.
pub trait Engine {
    fn solve(
        &mut self,
        model: &AssignmentModel,
        observer: &mut dyn Observer,
        stop: &StopToken,
    ) -> Result<EngineOutcome, EngineError>;
}
