use super::{ProjectId, StudentId};
use serde::{Deserialize, Serialize};

/// A partial assignment of students to projects. A student appears at most
/// once; students left out are unassigned.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
pub struct Solution {
    pub assignments: Vec<(StudentId, ProjectId)>,
}

impl Solution {
    pub fn new(assignments: Vec<(StudentId, ProjectId)>) -> Solution {
        Solution { assignments }
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn project_for(&self, student: StudentId) -> Option<ProjectId> {
        self.assignments
            .iter()
            .find(|&&(s, _)| s == student)
            .map(|&(_, p)| p)
    }

    pub fn students_for(&self, project: ProjectId) -> Vec<StudentId> {
        self.assignments
            .iter()
            .filter_map(|&(s, p)| if p == project { Some(s) } else { None })
            .collect()
    }

    /// Assignments ordered by project then student.
    pub fn sorted(&self) -> Vec<(StudentId, ProjectId)> {
        let mut assignments = self.assignments.clone();
        assignments.sort_by_key(|&(s, p)| (p, s));
        assignments
    }
}

#[test]
fn test_lookups() {
    let solution = Solution::new(vec![
        (StudentId(2), ProjectId(1)),
        (StudentId(1), ProjectId(1)),
        (StudentId(3), ProjectId(0)),
    ]);
    assert_eq!(solution.project_for(StudentId(1)), Some(ProjectId(1)));
    assert_eq!(solution.project_for(StudentId(9)), None);
    assert_eq!(
        solution.students_for(ProjectId(1)),
        vec![StudentId(2), StudentId(1)]
    );
    assert_eq!(
        solution.sorted(),
        vec![
            (StudentId(3), ProjectId(0)),
            (StudentId(1), ProjectId(1)),
            (StudentId(2), ProjectId(1)),
        ]
    );
    let json = serde_json::to_string(&solution).unwrap();
    assert!(json.starts_with(r#"{"assignments":[[2,1]"#));
}
