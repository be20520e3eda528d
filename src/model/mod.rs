pub use self::assignments::Assignments;
pub use self::error::ModelError;
pub use self::instance::Instance;
pub use self::project::{Project, ProjectId};
pub use self::solution::Solution;
pub use self::student::{Role, SkillLevel, Student, StudentId};

mod assignments;
mod error;
mod instance;
mod project;
mod solution;
mod student;
