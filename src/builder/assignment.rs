use super::formulation::{Formulation, LinearExpr, VarId};
use super::objective::{self, ObjectiveTerm, Tier};
use crate::model::{ProjectId, Solution, StudentId};

const ASSIGNED: f64 = 0.5;

/// Handles on the decision and helper variables, indexed densely.
#[derive(Clone, Debug)]
pub struct Variables {
    pub(super) assign: Vec<Vec<Option<VarId>>>,
    pub(super) skill_covered: Vec<Vec<VarId>>,
    pub(super) size_deviation: Vec<VarId>,
    pub(super) role_imbalance: Vec<VarId>,
}

impl Variables {
    /// `None` when the pair was excluded from the model.
    pub fn assign(&self, s: usize, p: usize) -> Option<VarId> {
        self.assign[s][p]
    }

    pub fn assignments(&self) -> impl Iterator<Item = (usize, usize, VarId)> + '_ {
        self.assign.iter().enumerate().flat_map(|(s, row)| {
            row.iter()
                .enumerate()
                .filter_map(move |(p, var)| var.map(|v| (s, p, v)))
        })
    }

    pub fn project_members(&self, p: usize) -> impl Iterator<Item = (usize, VarId)> + '_ {
        self.assign
            .iter()
            .enumerate()
            .filter_map(move |(s, row)| row[p].map(|v| (s, v)))
    }

    pub fn skill_covered(&self, p: usize, l: usize) -> VarId {
        self.skill_covered[p][l]
    }

    pub fn size_deviation(&self, p: usize) -> VarId {
        self.size_deviation[p]
    }

    pub fn role_imbalance(&self, p: usize) -> VarId {
        self.role_imbalance[p]
    }
}

/// Everything an engine needs: the formulation with its hard constraints, the
/// generated objective terms, and the mapping back to students and projects.
#[derive(Clone, Debug)]
pub struct AssignmentModel {
    pub(super) formulation: Formulation,
    pub(super) vars: Variables,
    pub(super) objective: Vec<(ObjectiveTerm, LinearExpr)>,
    pub(super) students: Vec<StudentId>,
    pub(super) projects: Vec<ProjectId>,
}

impl AssignmentModel {
    pub fn formulation(&self) -> &Formulation {
        &self.formulation
    }

    pub fn variables(&self) -> &Variables {
        &self.vars
    }

    pub fn objective_terms(&self) -> &[(ObjectiveTerm, LinearExpr)] {
        &self.objective
    }

    pub fn tiers(&self) -> Vec<Tier> {
        objective::tiers(&self.objective)
    }

    pub fn student_id(&self, s: usize) -> StudentId {
        self.students[s]
    }

    pub fn project_id(&self, p: usize) -> ProjectId {
        self.projects[p]
    }

    /// Read the assignment encoded by a vector of variable values.
    pub fn extract(&self, values: &[f64]) -> Solution {
        Solution::new(
            self.vars
                .assignments()
                .filter(|&(_, _, v)| values[v.0] > ASSIGNED)
                .map(|(s, p, _)| (self.students[s], self.projects[p]))
                .collect(),
        )
    }
}
