use super::{Engine, EngineError, EngineOutcome, Event, Incumbent, Observer, StopToken};
use crate::builder::{AssignmentModel, Constraint, Domain, LinearExpr, Relation};
use crate::config::EngineConfig;
use good_lp::constraint::{eq, geq, leq};
use good_lp::{
    Expression, ProblemVariables, ResolutionError, Solution, SolverModel, Variable,
    default_solver, variable,
};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

/// Lexicographic engine on top of `good_lp`: each tier is maximized in turn,
/// then locked at its optimum (minus `tolerance`) before the next one.
#[derive(Clone, Debug)]
pub struct LpEngine {
    time_limit: Option<Duration>,
    tolerance: f64,
}

impl Default for LpEngine {
    fn default() -> LpEngine {
        LpEngine::new(&EngineConfig::default())
    }
}

impl LpEngine {
    pub fn new(config: &EngineConfig) -> LpEngine {
        LpEngine {
            time_limit: config.time_limit(),
            tolerance: config.tier_tolerance.abs(),
        }
    }

    /// Maximize `objective` under the model and `locks`. With `relaxed`,
    /// binaries are read as continuous in `[0, 1]`.
    fn solve_tier(
        &self,
        model: &AssignmentModel,
        objective: &LinearExpr,
        locks: &[Constraint],
        relaxed: bool,
    ) -> Result<Option<Vec<f64>>, ResolutionError> {
        let mut problem = ProblemVariables::new();
        let vars = model
            .formulation()
            .vars()
            .iter()
            .map(|var| match var.domain {
                Domain::Binary if relaxed => {
                    problem.add(variable().min(0.0).max(1.0).name(var.name.clone()))
                }
                Domain::Binary => problem.add(variable().binary().name(var.name.clone())),
                Domain::NonNegative => problem.add(variable().min(0.0).name(var.name.clone())),
            })
            .collect::<Vec<_>>();
        let mut lp = problem
            .maximise(expression(objective, &vars))
            .using(default_solver);
        for c in model.formulation().constraints().iter().chain(locks) {
            if c.expr.is_empty() {
                // Constant constraints never reach the solver.
                if !c.is_satisfied(&[], self.tolerance) {
                    debug!(constraint = %c, "constant constraint cannot hold");
                    return Ok(None);
                }
                continue;
            }
            let lhs = expression(&c.expr, &vars);
            lp.add_constraint(match c.relation {
                Relation::LessEq => leq(lhs, c.rhs),
                Relation::GreaterEq => geq(lhs, c.rhs),
                Relation::Equal => eq(lhs, c.rhs),
            });
        }
        match lp.solve() {
            Ok(solution) => Ok(Some(vars.iter().map(|&v| solution.value(v)).collect())),
            Err(ResolutionError::Infeasible) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

fn engine_error(e: ResolutionError, tier: usize) -> EngineError {
    match e {
        ResolutionError::Unbounded => EngineError::Unbounded { tier },
        e => EngineError::Solver(e.to_string()),
    }
}

fn expression(expr: &LinearExpr, vars: &[Variable]) -> Expression {
    expr.terms().iter().map(|&(v, c)| c * vars[v.0]).sum()
}

impl Engine for LpEngine {
    fn solve(
        &mut self,
        model: &AssignmentModel,
        observer: &mut dyn Observer,
        stop: &StopToken,
    ) -> Result<EngineOutcome, EngineError> {
        let started = Instant::now();
        let mut tiers = model.tiers();
        if tiers.is_empty() {
            observer.notify(Event::Log("no objective terms, searching for a feasible assignment"));
        }
        let feasibility = tiers.is_empty();
        let mut locks = Vec::new();
        let mut incumbent: Option<Incumbent> = None;
        let mut values = Vec::new();
        let count = tiers.len().max(1);
        for index in 0..count {
            if stop.is_stop_requested() {
                info!(tier = index, "stop requested");
                observer.notify(Event::Log("stop requested, returning best incumbent"));
                return Ok(match incumbent {
                    Some(incumbent) => EngineOutcome::Feasible(incumbent),
                    None => EngineOutcome::Interrupted,
                });
            }
            let expired = self
                .time_limit
                .is_some_and(|limit| started.elapsed() >= limit);
            if expired {
                if let Some(current) = incumbent.take() {
                    info!(tier = index, "time limit reached");
                    observer.notify(Event::Log("time limit reached, returning best incumbent"));
                    return Ok(EngineOutcome::Feasible(current));
                }
            }
            let (priority, label, objective) = match tiers.get_mut(index) {
                Some(tier) => (
                    tier.priority,
                    tier.label(),
                    std::mem::take(&mut tier.expr),
                ),
                None => (0, String::from("feasibility"), LinearExpr::new()),
            };
            observer.notify(Event::Tier { index, priority });
            let line = format!("tier {}/{}: maximizing {}", index + 1, count, label);
            debug!("{line}");
            observer.notify(Event::Log(&line));
            // The relaxation bounds the tier from above; when it is
            // infeasible so is the integer problem.
            let bound = if feasibility {
                None
            } else {
                self.solve_tier(model, &objective, &locks, true)
                    .map_err(|e| engine_error(e, index))?
                    .map(|relaxed| objective.eval(&relaxed))
            };
            if let Some(bound) = bound {
                trace!(tier = index, bound, "relaxation solved");
                observer.notify(Event::Progress {
                    bound,
                    objective: f64::INFINITY,
                });
            }
            let solved = if feasibility || bound.is_some() {
                self.solve_tier(model, &objective, &locks, false)
                    .map_err(|e| engine_error(e, index))?
            } else {
                None
            };
            let Some(tier_values) = solved else {
                if let Some(current) = incumbent {
                    warn!(tier = index, "locked tier became infeasible, keeping incumbent");
                    observer.notify(Event::Log("tier infeasible under locks, keeping incumbent"));
                    return Ok(EngineOutcome::Feasible(current));
                }
                observer.notify(Event::Log("model is infeasible"));
                return Ok(EngineOutcome::Infeasible);
            };
            let value = objective.eval(&tier_values);
            observer.notify(Event::Progress {
                bound: value,
                objective: value,
            });
            observer.notify(Event::Log(&format!("tier {}/{}: value {value}", index + 1, count)));
            locks.push(Constraint::geq(
                format!("lock_{index}"),
                objective,
                value - self.tolerance,
            ));
            let mut reached = incumbent.map(|i| i.tier_values).unwrap_or_default();
            if !feasibility {
                reached.push(value);
            }
            incumbent = Some(Incumbent {
                solution: model.extract(&tier_values),
                tier_values: reached,
            });
            values = tier_values;
        }
        debug!(
            elapsed = ?started.elapsed(),
            violated = model.formulation().violated(&values, 1e-6).len(),
            "search completed"
        );
        Ok(match incumbent {
            Some(incumbent) => EngineOutcome::Optimal(incumbent),
            None => EngineOutcome::Infeasible,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Termination;
    use crate::builder::{self, DislikeMode, Objectives, TermKind};
    use crate::config::ModelConfig;
    use crate::model::{Instance, Project, ProjectId, Role, SkillLevel, Student, StudentId};

    fn solve(instance: &Instance, config: &ModelConfig) -> EngineOutcome {
        let model = builder::build(instance, config).unwrap();
        let mut events = Vec::new();
        let outcome = LpEngine::default()
            .solve(
                &model,
                &mut |event: Event<'_>| {
                    if let Event::Tier { index, .. } = event {
                        events.push(index);
                    }
                },
                &StopToken::new(),
            )
            .unwrap();
        assert!(events.windows(2).all(|w| w[0] < w[1]));
        outcome
    }

    #[test]
    fn preferred_projects_win() {
        let instance = Instance::new(
            vec![
                Student::new(StudentId(1)).preferring(&[ProjectId(2)]),
                Student::new(StudentId(2)).preferring(&[ProjectId(1)]),
            ],
            vec![
                Project::new(ProjectId(1), 0, 1, 1),
                Project::new(ProjectId(2), 0, 1, 1),
            ],
            &[],
        );
        let outcome = solve(&instance, &ModelConfig::default());
        assert_eq!(outcome.termination(), Some(Termination::Optimal));
        let solution = outcome.into_solution().unwrap();
        assert_eq!(solution.project_for(StudentId(1)), Some(ProjectId(2)));
        assert_eq!(solution.project_for(StudentId(2)), Some(ProjectId(1)));
    }

    #[test]
    fn role_balance_breaks_ties() {
        let instance = Instance::new(
            vec![
                Student::new(StudentId(1)).with_role(Role::Technical),
                Student::new(StudentId(2)).with_role(Role::Technical),
                Student::new(StudentId(3)).with_role(Role::Writing),
                Student::new(StudentId(4)).with_role(Role::Writing),
            ],
            vec![
                Project::new(ProjectId(1), 2, 2, 2),
                Project::new(ProjectId(2), 2, 2, 2),
            ],
            &[],
        );
        let solution = solve(&instance, &ModelConfig::default())
            .into_solution()
            .unwrap();
        assert_eq!(solution.len(), 4);
        for p in [ProjectId(1), ProjectId(2)] {
            let members = solution.students_for(p);
            let writers = members
                .iter()
                .filter(|s| instance.student(**s).unwrap().role == Role::Writing)
                .count();
            assert_eq!(writers, 1);
        }
    }

    #[test]
    fn unattainable_skill_is_infeasible() {
        let instance = Instance::new(
            vec![Student::new(StudentId(1)).with_skill("rust", SkillLevel::None)],
            vec![Project::new(ProjectId(1), 0, 1, 1).requiring(&[true])],
            &["rust"],
        );
        assert_eq!(
            solve(&instance, &ModelConfig::default()),
            EngineOutcome::Infeasible
        );
    }

    #[test]
    fn forbidden_dislike_can_make_minimum_unreachable() {
        let instance = Instance::new(
            vec![Student::new(StudentId(1)).disliking(&[ProjectId(1)])],
            vec![Project::new(ProjectId(1), 1, 1, 1)],
            &[],
        );
        assert_eq!(
            solve(&instance, &ModelConfig::default()),
            EngineOutcome::Infeasible
        );
        let penalize = ModelConfig {
            dislikes: DislikeMode::Penalize,
            ..ModelConfig::default()
        };
        let solution = solve(&instance, &penalize).into_solution().unwrap();
        assert_eq!(solution.project_for(StudentId(1)), Some(ProjectId(1)));
    }

    #[test]
    fn empty_objective_still_finds_a_feasible_assignment() {
        let instance = Instance::new(
            vec![Student::new(StudentId(1))],
            vec![Project::new(ProjectId(1), 1, 1, 1)],
            &[],
        );
        let config = ModelConfig {
            objectives: Objectives::new(Vec::new()),
            ..ModelConfig::default()
        };
        match solve(&instance, &config) {
            EngineOutcome::Optimal(incumbent) => {
                assert!(incumbent.tier_values.is_empty());
                assert_eq!(incumbent.solution.len(), 1);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn tier_values_follow_priorities() {
        let instance = Instance::new(
            vec![Student::new(StudentId(1)).preferring(&[ProjectId(1)])],
            vec![Project::new(ProjectId(1), 0, 1, 1)],
            &[],
        );
        let config = ModelConfig {
            objectives: Objectives::canonical().without(TermKind::DislikedPenalty),
            ..ModelConfig::default()
        };
        match solve(&instance, &config) {
            EngineOutcome::Optimal(incumbent) => {
                assert_eq!(incumbent.tier_values.len(), 5);
                assert!((incumbent.tier_values[0] - 2.0).abs() < 1e-6);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn relaxation_bounds_each_tier_before_its_value() {
        let instance = Instance::new(
            vec![
                Student::new(StudentId(1)).preferring(&[ProjectId(1)]),
                Student::new(StudentId(2)).preferring(&[ProjectId(1)]),
                Student::new(StudentId(3)).preferring(&[ProjectId(2)]),
            ],
            vec![
                Project::new(ProjectId(1), 0, 1, 1),
                Project::new(ProjectId(2), 0, 1, 2),
            ],
            &[],
        );
        let model = builder::build(&instance, &ModelConfig::default()).unwrap();
        let mut reports = Vec::new();
        LpEngine::default()
            .solve(
                &model,
                &mut |event: Event<'_>| {
                    if let Event::Progress { bound, objective } = event {
                        reports.push((bound, objective));
                    }
                },
                &StopToken::new(),
            )
            .unwrap();
        assert_eq!(reports.len(), 2 * model.tiers().len());
        for pair in reports.chunks(2) {
            let (bound, pending) = pair[0];
            let (closed, value) = pair[1];
            assert!(bound.is_finite());
            assert_eq!(pending, f64::INFINITY);
            assert_eq!(closed, value);
            assert!(bound >= value - 1e-6, "{bound} < {value}");
        }
    }

    #[test]
    fn stop_before_first_tier_interrupts() {
        let instance = Instance::new(
            vec![Student::new(StudentId(1))],
            vec![Project::new(ProjectId(1), 0, 1, 1)],
            &[],
        );
        let model = builder::build(&instance, &ModelConfig::default()).unwrap();
        let stop = StopToken::new();
        stop.request_stop();
        let outcome = LpEngine::default()
            .solve(&model, &mut |_: Event<'_>| {}, &stop)
            .unwrap();
        assert_eq!(outcome, EngineOutcome::Interrupted);
    }

    #[test]
    fn stop_after_first_tier_keeps_incumbent() {
        let instance = Instance::new(
            vec![Student::new(StudentId(1)).preferring(&[ProjectId(1)])],
            vec![Project::new(ProjectId(1), 0, 1, 1)],
            &[],
        );
        let model = builder::build(&instance, &ModelConfig::default()).unwrap();
        let stop = StopToken::new();
        let trigger = stop.clone();
        let outcome = LpEngine::default()
            .solve(
                &model,
                &mut |event: Event<'_>| {
                    if let Event::Progress { .. } = event {
                        trigger.request_stop();
                    }
                },
                &stop,
            )
            .unwrap();
        match outcome {
            EngineOutcome::Feasible(incumbent) => assert_eq!(incumbent.tier_values.len(), 1),
            other => panic!("unexpected outcome {other:?}"),
        }
    }
}
