use crate::builder::DislikeMode;
use crate::model::{Assignments, Instance, ModelError, ProjectId, Solution, StudentId};
use thiserror::Error;
use tracing::warn;

/// A hard constraint broken by a solution.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum ConstraintViolation {
    #[error("project {project} has {size} students, outside of [{min}, {max}]")]
    Capacity {
        project: ProjectId,
        size: usize,
        min: u32,
        max: u32,
    },
    #[error("student {student} is assigned {count} times")]
    Uniqueness { student: StudentId, count: usize },
    #[error("project {project} has no member skilled in {language}")]
    SkillCoverage {
        project: ProjectId,
        language: String,
    },
    #[error("student {student} is assigned to disliked project {project}")]
    Disliked {
        student: StudentId,
        project: ProjectId,
    },
    #[error("unknown student {0} in solution")]
    UnknownStudent(StudentId),
    #[error("unknown project {0} in solution")]
    UnknownProject(ProjectId),
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ViolationKind {
    Capacity,
    Uniqueness,
    SkillCoverage,
    Disliked,
    Reference,
}

impl ConstraintViolation {
    pub fn kind(&self) -> ViolationKind {
        match self {
            ConstraintViolation::Capacity { .. } => ViolationKind::Capacity,
            ConstraintViolation::Uniqueness { .. } => ViolationKind::Uniqueness,
            ConstraintViolation::SkillCoverage { .. } => ViolationKind::SkillCoverage,
            ConstraintViolation::Disliked { .. } => ViolationKind::Disliked,
            ConstraintViolation::UnknownStudent(_) | ConstraintViolation::UnknownProject(_) => {
                ViolationKind::Reference
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Violation(#[from] ConstraintViolation),
}

/// Every hard constraint broken by the solution. Disliked assignments are
/// only violations when dislikes are forbidden.
pub fn violations(a: &Assignments, dislikes: DislikeMode) -> Vec<ConstraintViolation> {
    let mut violations = Vec::new();
    violations.extend(
        a.unknown_students()
            .iter()
            .map(|&s| ConstraintViolation::UnknownStudent(s)),
    );
    violations.extend(
        a.unknown_projects()
            .iter()
            .map(|&p| ConstraintViolation::UnknownProject(p)),
    );
    for s in a.all_students() {
        if a.occurrences(s) > 1 {
            violations.push(ConstraintViolation::Uniqueness {
                student: a.student(s).id,
                count: a.occurrences(s),
            });
        }
    }
    for p in a.filter_projects(|p| !a.is_acceptable(p)) {
        let project = a.project(p);
        violations.push(ConstraintViolation::Capacity {
            project: project.id,
            size: a.size(p),
            min: project.min,
            max: project.max,
        });
    }
    for p in a.all_projects() {
        let project = a.project(p);
        for l in project.required_languages() {
            if !a.has_proficiency(p, l) {
                violations.push(ConstraintViolation::SkillCoverage {
                    project: project.id,
                    language: a.index().languages()[l].clone(),
                });
            }
        }
    }
    if dislikes == DislikeMode::Forbid {
        for p in a.all_projects() {
            for &s in a.students_for(p) {
                if a.index().dislikes(s, p) {
                    violations.push(ConstraintViolation::Disliked {
                        student: a.student(s).id,
                        project: a.project(p).id,
                    });
                }
            }
        }
    }
    violations
}

/// Acceptance test for a solution: the first broken constraint is returned
/// as an error, after all of them have been logged.
pub fn validate(
    instance: &Instance,
    solution: &Solution,
    dislikes: DislikeMode,
) -> Result<(), ValidationError> {
    let a = Assignments::new(instance, solution)?;
    let mut violations = violations(&a, dislikes);
    for violation in &violations {
        warn!("constraint violation: {violation}");
    }
    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations.swap_remove(0).into())
    }
}
