//! Translation of an instance into decision variables, hard constraints and a
//! prioritized objective bundle.

pub use self::assignment::{AssignmentModel, Variables};
pub use self::formulation::{Constraint, Domain, Formulation, LinearExpr, Relation, Var, VarId};
pub use self::objective::{ObjectiveTerm, Objectives, TermKind, Tier};

mod assignment;
mod formulation;
mod objective;

use crate::config::ModelConfig;
use crate::model::{Instance, ModelError, SkillLevel};
use crate::remap::InstanceIndex;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace};

/// How disliked projects are handled.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DislikeMode {
    /// No variable exists for a disliked pair: it can never be assigned.
    #[default]
    Forbid,
    /// Disliked pairs are allowed but penalized by the objective.
    Penalize,
}

#[instrument(skip_all, fields(students = instance.students.len(), projects = instance.projects.len()))]
pub fn build(instance: &Instance, config: &ModelConfig) -> Result<AssignmentModel, ModelError> {
    let index = InstanceIndex::new(instance)?;
    let mut formulation = Formulation::new();
    let vars = add_variables(&index, config.dislikes, &mut formulation);
    add_capacity_constraints(&index, &vars, &mut formulation);
    add_student_constraints(&index, &vars, &mut formulation);
    add_skill_constraints(&index, &vars, &mut formulation);
    add_balance_constraints(&index, &vars, &mut formulation);
    let objective = config
        .objectives
        .terms()
        .iter()
        .map(|&term| (term, generate(term.kind, &index, &vars)))
        .collect::<Vec<_>>();
    debug!(
        variables = formulation.vars().len(),
        constraints = formulation.constraints().len(),
        terms = objective.len(),
        "assignment model built"
    );
    Ok(AssignmentModel {
        formulation,
        vars,
        objective,
        students: index.students().iter().map(|s| s.id).collect(),
        projects: index.projects().iter().map(|p| p.id).collect(),
    })
}

fn add_variables(index: &InstanceIndex, dislikes: DislikeMode, f: &mut Formulation) -> Variables {
    let assign = index
        .students()
        .iter()
        .enumerate()
        .map(|(s, student)| {
            index
                .projects()
                .iter()
                .enumerate()
                .map(|(p, project)| {
                    if dislikes == DislikeMode::Forbid && index.dislikes(s, p) {
                        trace!(student = %student.id, project = %project.id, "excluding disliked pair");
                        None
                    } else {
                        Some(f.add_var(
                            format!("assign_{}_{}", student.id, project.id),
                            Domain::Binary,
                        ))
                    }
                })
                .collect()
        })
        .collect();
    let skill_covered = index
        .projects()
        .iter()
        .map(|project| {
            index
                .languages()
                .iter()
                .map(|language| {
                    f.add_var(format!("covered_{}_{}", project.id, language), Domain::Binary)
                })
                .collect()
        })
        .collect();
    let size_deviation = index
        .projects()
        .iter()
        .map(|project| f.add_var(format!("size_dev_{}", project.id), Domain::NonNegative))
        .collect();
    let role_imbalance = index
        .projects()
        .iter()
        .map(|project| f.add_var(format!("role_imb_{}", project.id), Domain::NonNegative))
        .collect();
    Variables {
        assign,
        skill_covered,
        size_deviation,
        role_imbalance,
    }
}

fn headcount(vars: &Variables, p: usize) -> LinearExpr {
    vars.project_members(p).map(|(_, v)| (v, 1.0)).collect()
}

fn add_capacity_constraints(index: &InstanceIndex, vars: &Variables, f: &mut Formulation) {
    for (p, project) in index.projects().iter().enumerate() {
        let count = headcount(vars, p);
        f.add_constraint(Constraint::leq(
            format!("max_{}", project.id),
            count.clone(),
            f64::from(project.max),
        ));
        f.add_constraint(Constraint::geq(
            format!("min_{}", project.id),
            count,
            f64::from(project.min),
        ));
    }
}

fn add_student_constraints(index: &InstanceIndex, vars: &Variables, f: &mut Formulation) {
    for (s, student) in index.students().iter().enumerate() {
        let choices = (0..index.projects().len())
            .filter_map(|p| vars.assign(s, p).map(|v| (v, 1.0)))
            .collect::<LinearExpr>();
        if !choices.is_empty() {
            f.add_constraint(Constraint::leq(format!("once_{}", student.id), choices, 1.0));
        }
    }
}

fn add_skill_constraints(index: &InstanceIndex, vars: &Variables, f: &mut Formulation) {
    for (p, project) in index.projects().iter().enumerate() {
        for (l, language) in index.languages().iter().enumerate() {
            let covered = vars.skill_covered(p, l);
            if !project.requires(l) {
                f.add_constraint(Constraint::eq(
                    format!("uncovered_{}_{}", project.id, language),
                    LinearExpr::new().with(covered, 1.0),
                    0.0,
                ));
                continue;
            }
            let proficiency = vars
                .project_members(p)
                .filter_map(|(s, v)| {
                    let level = index.skill(s, l);
                    if level > SkillLevel::None {
                        Some((v, f64::from(level.value())))
                    } else {
                        None
                    }
                })
                .collect::<LinearExpr>();
            f.add_constraint(Constraint::geq(
                format!("skill_{}_{}", project.id, language),
                proficiency,
                1.0,
            ));
            // covered <= number of adequately skilled members
            let mut coverage = LinearExpr::new().with(covered, 1.0);
            for (s, v) in vars.project_members(p) {
                if index.skill(s, l).is_adequate() {
                    coverage.add(v, -1.0);
                }
            }
            f.add_constraint(Constraint::leq(
                format!("covered_{}_{}", project.id, language),
                coverage,
                0.0,
            ));
        }
    }
}

fn add_balance_constraints(index: &InstanceIndex, vars: &Variables, f: &mut Formulation) {
    for (p, project) in index.projects().iter().enumerate() {
        let opt = f64::from(project.opt);
        // dev >= count - opt and dev >= opt - count
        let dev = vars.size_deviation(p);
        let mut above = LinearExpr::new().with(dev, 1.0);
        let mut below = LinearExpr::new().with(dev, 1.0);
        for (_, v) in vars.project_members(p) {
            above.add(v, -1.0);
            below.add(v, 1.0);
        }
        f.add_constraint(Constraint::geq(format!("size_above_{}", project.id), above, -opt));
        f.add_constraint(Constraint::geq(format!("size_below_{}", project.id), below, opt));

        let imb = vars.role_imbalance(p);
        let mut technical = LinearExpr::new().with(imb, 1.0);
        let mut writing = LinearExpr::new().with(imb, 1.0);
        for (s, v) in vars.project_members(p) {
            let sign = index.student(s).role.sign();
            technical.add(v, -sign);
            writing.add(v, sign);
        }
        f.add_constraint(Constraint::geq(format!("role_a_{}", project.id), technical, 0.0));
        f.add_constraint(Constraint::geq(format!("role_b_{}", project.id), writing, 0.0));
    }
}

/// Expression of a term, to be maximized.
fn generate(kind: TermKind, index: &InstanceIndex, vars: &Variables) -> LinearExpr {
    let projects = 0..index.projects().len();
    match kind {
        TermKind::DislikedPenalty => vars
            .assignments()
            .filter(|&(s, p, _)| index.dislikes(s, p))
            .map(|(_, _, v)| (v, -1.0))
            .collect(),
        TermKind::Preference => vars
            .assignments()
            .filter_map(|(s, p, v)| {
                if index.prefers(s, p) {
                    Some((v, 2.0))
                } else if index.dislikes(s, p) {
                    None
                } else {
                    Some((v, 1.0))
                }
            })
            .collect(),
        TermKind::SkillCoverage => projects
            .flat_map(|p| {
                index
                    .project(p)
                    .required_languages()
                    .map(move |l| (vars.skill_covered(p, l), 1.0))
            })
            .collect(),
        TermKind::SizeDeviation => projects.map(|p| (vars.size_deviation(p), -1.0)).collect(),
        TermKind::RoleImbalance => projects.map(|p| (vars.role_imbalance(p), -1.0)).collect(),
        TermKind::SkillRelevance => vars
            .assignments()
            .filter(|&(s, p, _)| index.is_relevant(s, p))
            .map(|(_, _, v)| (v, 1.0))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Project, ProjectId, Role, Student, StudentId};

    fn instance() -> Instance {
        Instance::new(
            vec![
                Student::new(StudentId(1))
                    .preferring(&[ProjectId(10)])
                    .disliking(&[ProjectId(20)])
                    .with_skill("rust", SkillLevel::Expert),
                Student::new(StudentId(2))
                    .preferring(&[ProjectId(20)])
                    .with_role(Role::Writing)
                    .with_skill("rust", SkillLevel::Beginner),
            ],
            vec![
                Project::new(ProjectId(10), 0, 1, 2).requiring(&[true]),
                Project::new(ProjectId(20), 0, 1, 2),
            ],
            &["rust"],
        )
    }

    fn names(model: &AssignmentModel) -> Vec<&str> {
        model
            .formulation()
            .vars()
            .iter()
            .map(|v| v.name.as_str())
            .collect()
    }

    #[test]
    fn forbidden_dislikes_have_no_variable() {
        let model = build(&instance(), &ModelConfig::default()).unwrap();
        assert!(model.variables().assign(0, 1).is_none());
        assert!(model.variables().assign(1, 1).is_some());
        assert_eq!(model.variables().assignments().count(), 3);
        assert!(!names(&model).contains(&"assign_1_20"));
        let penalty = &model.objective_terms()[0];
        assert_eq!(penalty.0.kind, TermKind::DislikedPenalty);
        assert!(penalty.1.is_empty());
    }

    #[test]
    fn penalized_dislikes_are_in_the_model() {
        let config = ModelConfig {
            dislikes: DislikeMode::Penalize,
            ..ModelConfig::default()
        };
        let model = build(&instance(), &config).unwrap();
        let disliked = model.variables().assign(0, 1).unwrap();
        assert_eq!(model.formulation().var(disliked).name, "assign_1_20");
        let terms = model.objective_terms();
        assert_eq!(terms[0].1.terms(), &[(disliked, -1.0)]);
        // disliked pairs are neither preferred nor neutral
        assert!(terms[1].1.terms().iter().all(|&(v, _)| v != disliked));
    }

    #[test]
    fn preference_rewards_preferred_twice_as_much() {
        let model = build(&instance(), &ModelConfig::default()).unwrap();
        let vars = model.variables();
        let preference = &model.objective_terms()[1].1;
        let weight = |s, p| {
            let v = vars.assign(s, p).unwrap();
            preference.terms().iter().find(|t| t.0 == v).map(|t| t.1)
        };
        assert_eq!(weight(0, 0), Some(2.0));
        assert_eq!(weight(1, 0), Some(1.0));
        assert_eq!(weight(1, 1), Some(2.0));
    }

    #[test]
    fn constraints_encode_capacity_skills_and_balance() {
        let model = build(&instance(), &ModelConfig::default()).unwrap();
        let vars = model.variables();
        let f = model.formulation();
        let n = f.vars().len();
        // student 1 on project 10, student 2 on project 20
        let mut values = vec![0.0; n];
        values[vars.assign(0, 0).unwrap().0] = 1.0;
        values[vars.assign(1, 1).unwrap().0] = 1.0;
        values[vars.skill_covered(0, 0).0] = 1.0;
        values[vars.role_imbalance(0).0] = 1.0;
        values[vars.role_imbalance(1).0] = 1.0;
        assert!(f.violated(&values, 1e-9).is_empty());

        // covering without an adequate member is not allowed
        let mut uncovered = vec![0.0; n];
        uncovered[vars.assign(1, 0).unwrap().0] = 1.0;
        uncovered[vars.skill_covered(0, 0).0] = 1.0;
        uncovered[vars.size_deviation(1).0] = 1.0;
        uncovered[vars.role_imbalance(0).0] = 1.0;
        let broken = f
            .violated(&uncovered, 1e-9)
            .into_iter()
            .map(|c| c.name.clone())
            .collect::<Vec<_>>();
        assert_eq!(broken, vec!["covered_10_rust"]);

        // a required language with no proficient member breaks the skill row
        let mut empty = vec![0.0; n];
        empty[vars.size_deviation(0).0] = 1.0;
        empty[vars.size_deviation(1).0] = 1.0;
        let broken = f
            .violated(&empty, 1e-9)
            .into_iter()
            .map(|c| c.name.clone())
            .collect::<Vec<_>>();
        assert_eq!(broken, vec!["skill_10_rust"]);
    }

    #[test]
    fn inverted_capacity_is_rejected_before_building() {
        let mut instance = instance();
        instance.projects[1].min = 3;
        assert!(matches!(
            build(&instance, &ModelConfig::default()),
            Err(ModelError::InvalidCapacity { .. })
        ));
    }

    #[test]
    fn removing_terms_leaves_constraints_untouched() {
        let full = build(&instance(), &ModelConfig::default()).unwrap();
        let config = ModelConfig {
            objectives: Objectives::canonical()
                .without(TermKind::RoleImbalance)
                .reweighted(TermKind::Preference, 10.0),
            ..ModelConfig::default()
        };
        let trimmed = build(&instance(), &config).unwrap();
        assert_eq!(
            full.formulation().constraints(),
            trimmed.formulation().constraints()
        );
        assert_eq!(trimmed.tiers().len(), 5);
        assert_eq!(trimmed.tiers()[1].expr.terms()[0].1, 20.0);
    }
}
