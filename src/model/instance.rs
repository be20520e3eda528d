use super::{ModelError, Project, ProjectId, Student, StudentId};
use crate::remap::InstanceIndex;
use serde::{Deserialize, Serialize};

/// Everything a solve request is about. Skill requirement vectors and skill
/// maps are all read against `languages`.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Instance {
    pub students: Vec<Student>,
    pub projects: Vec<Project>,
    #[serde(default, alias = "programming_languages")]
    pub languages: Vec<String>,
}

impl Instance {
    pub fn new(students: Vec<Student>, projects: Vec<Project>, languages: &[&str]) -> Instance {
        Instance {
            students,
            projects,
            languages: languages.iter().map(|&l| l.to_owned()).collect(),
        }
    }

    pub fn student(&self, id: StudentId) -> Option<&Student> {
        self.students.iter().find(|s| s.id == id)
    }

    pub fn project(&self, id: ProjectId) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }

    pub fn language_index(&self, language: &str) -> Option<usize> {
        self.languages.iter().position(|l| l == language)
    }

    /// Check every structural invariant, reporting the first broken one.
    pub fn validate(&self) -> Result<(), ModelError> {
        InstanceIndex::new(self).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instance_accepts_original_language_field() {
        let instance: Instance = serde_json::from_str(
            r#"{
                "students": [{"id": 1, "projects": [10]}],
                "projects": [{"id": 10, "min": 1, "opt": 2, "max": 3,
                              "language_requirements": [true, false]}],
                "programming_languages": ["python", "java"]
            }"#,
        )
        .unwrap();
        assert_eq!(instance.language_index("java"), Some(1));
        assert_eq!(instance.project(ProjectId(10)).map(|p| p.role_ratio), Some(50));
        assert!(instance.student(StudentId(1)).is_some());
        assert_eq!(instance.validate(), Ok(()));
    }

    #[test]
    fn validate_reports_inverted_capacity() {
        let instance = Instance::new(
            vec![],
            vec![Project::new(ProjectId(3), 5, 5, 4)],
            &[],
        );
        assert!(matches!(
            instance.validate(),
            Err(ModelError::InvalidCapacity { min: 5, max: 4, .. })
        ));
    }
}
