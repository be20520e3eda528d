//! Prioritized objective bundle. Terms are descriptors (kind, priority,
//! weight); the builder turns each kind into a linear expression over the
//! model variables. Terms with a strictly higher priority dominate all lower
//! ones, terms sharing a priority are summed with their weights.

use super::formulation::LinearExpr;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TermKind {
    /// Penalize assignments to a disliked project.
    DislikedPenalty,
    /// Reward preferred assignments (2) over neutral ones (1).
    Preference,
    /// Reward each required language covered by an adequately skilled member.
    SkillCoverage,
    /// Penalize the distance between project sizes and their optimum.
    SizeDeviation,
    /// Penalize the difference between technical and writing members.
    RoleImbalance,
    /// Reward assignments of students skilled in a required language.
    SkillRelevance,
}

impl TermKind {
    pub fn name(self) -> &'static str {
        match self {
            TermKind::DislikedPenalty => "disliked_penalty",
            TermKind::Preference => "preference",
            TermKind::SkillCoverage => "skill_coverage",
            TermKind::SizeDeviation => "size_deviation",
            TermKind::RoleImbalance => "role_imbalance",
            TermKind::SkillRelevance => "skill_relevance",
        }
    }
}

impl fmt::Display for TermKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn default_weight() -> f64 {
    1.0
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct ObjectiveTerm {
    pub kind: TermKind,
    pub priority: u32,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

impl ObjectiveTerm {
    pub fn new(kind: TermKind, priority: u32, weight: f64) -> ObjectiveTerm {
        ObjectiveTerm {
            kind,
            priority,
            weight,
        }
    }
}

/// Ordered list of objective terms.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Objectives(Vec<ObjectiveTerm>);

impl Default for Objectives {
    fn default() -> Objectives {
        Objectives::canonical()
    }
}

impl Objectives {
    pub fn new(terms: Vec<ObjectiveTerm>) -> Objectives {
        Objectives(terms)
    }

    /// The six canonical terms, each in its own tier, in descending priority.
    pub fn canonical() -> Objectives {
        use TermKind::*;
        Objectives(
            [
                DislikedPenalty,
                Preference,
                SkillCoverage,
                SizeDeviation,
                RoleImbalance,
                SkillRelevance,
            ]
            .into_iter()
            .zip((1..=6).rev())
            .map(|(kind, priority)| ObjectiveTerm::new(kind, priority, 1.0))
            .collect(),
        )
    }

    pub fn terms(&self) -> &[ObjectiveTerm] {
        &self.0
    }

    pub fn with(mut self, term: ObjectiveTerm) -> Objectives {
        self.0.push(term);
        self
    }

    pub fn without(mut self, kind: TermKind) -> Objectives {
        self.0.retain(|t| t.kind != kind);
        self
    }

    pub fn reweighted(mut self, kind: TermKind, weight: f64) -> Objectives {
        for term in self.0.iter_mut().filter(|t| t.kind == kind) {
            term.weight = weight;
        }
        self
    }

    pub fn reprioritized(mut self, kind: TermKind, priority: u32) -> Objectives {
        for term in self.0.iter_mut().filter(|t| t.kind == kind) {
            term.priority = priority;
        }
        self
    }

    /// Distinct priorities, highest first.
    pub fn priorities(&self) -> Vec<u32> {
        descending(self.0.iter().map(|t| t.priority))
    }
}

/// One level of the lexicographic objective: the weighted sum of every term
/// sharing `priority`. Always maximized.
#[derive(Clone, Debug, PartialEq)]
pub struct Tier {
    pub priority: u32,
    pub kinds: Vec<TermKind>,
    pub expr: LinearExpr,
}

impl Tier {
    pub fn label(&self) -> String {
        format!(
            "priority {} ({})",
            self.priority,
            self.kinds.iter().map(|k| k.name()).join("+")
        )
    }
}

fn descending(priorities: impl Iterator<Item = u32>) -> Vec<u32> {
    priorities
        .sorted_unstable_by(|a, b| b.cmp(a))
        .dedup()
        .collect()
}

/// Group generated term expressions into tiers of descending priority.
pub fn tiers(terms: &[(ObjectiveTerm, LinearExpr)]) -> Vec<Tier> {
    descending(terms.iter().map(|(t, _)| t.priority))
        .into_iter()
        .map(|priority| {
            let mut tier = Tier {
                priority,
                kinds: Vec::new(),
                expr: LinearExpr::new(),
            };
            for (term, expr) in terms.iter().filter(|(t, _)| t.priority == priority) {
                tier.kinds.push(term.kind);
                tier.expr.extend_scaled(expr, term.weight);
            }
            tier
        })
        .collect()
}
