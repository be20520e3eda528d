use super::{ProjectId, StudentId};
use thiserror::Error;

/// Structural errors in an instance. These are detected before any solver
/// is involved.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum ModelError {
    #[error("student {0} appears more than once")]
    DuplicateStudent(StudentId),
    #[error("project {0} appears more than once")]
    DuplicateProject(ProjectId),
    #[error("language `{0}` appears more than once")]
    DuplicateLanguage(String),
    #[error("student {student} has a skill in unknown language `{language}`")]
    UnknownLanguage { student: StudentId, language: String },
    #[error(
        "project {project} lists {requirements} skill requirements but only {languages} languages are known"
    )]
    UnknownRequirement {
        project: ProjectId,
        requirements: usize,
        languages: usize,
    },
    #[error("student {student} references unknown project {project}")]
    UnknownProject {
        student: StudentId,
        project: ProjectId,
    },
    #[error("student {student} lists project {project} more than once")]
    DuplicateChoice {
        student: StudentId,
        project: ProjectId,
    },
    #[error("student {student} both prefers and dislikes project {project}")]
    ConflictingChoice {
        student: StudentId,
        project: ProjectId,
    },
    #[error("project {project} has a minimum of {min} above its maximum of {max}")]
    InvalidCapacity { project: ProjectId, min: u32, max: u32 },
    #[error("project {project} has an optimum of {opt} outside of [{min}, {max}]")]
    InvalidOptimum {
        project: ProjectId,
        min: u32,
        opt: u32,
        max: u32,
    },
    #[error("project {project} has a role ratio of {ratio}%")]
    InvalidRoleRatio { project: ProjectId, ratio: u8 },
}
