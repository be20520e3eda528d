use super::*;
use crate::remap::InstanceIndex;

/// Read-only view of a solution over the dense indices of its instance.
///
/// Assignments referencing unknown students or projects are set aside, and a
/// student listed several times is counted in every project it appears in,
/// so that the checks can report those situations instead of hiding them.
#[derive(Debug)]
pub struct Assignments<'a> {
    index: InstanceIndex<'a>,
    assigned_to: Vec<Option<usize>>,
    assigned: Vec<Vec<usize>>,
    occurrences: Vec<usize>,
    unknown_students: Vec<StudentId>,
    unknown_projects: Vec<ProjectId>,
}

impl<'a> Assignments<'a> {
    pub fn new(instance: &'a Instance, solution: &Solution) -> Result<Assignments<'a>, ModelError> {
        let index = InstanceIndex::new(instance)?;
        let slen = instance.students.len();
        let plen = instance.projects.len();
        let mut assignments = Assignments {
            index,
            assigned_to: vec![None; slen],
            assigned: vec![Vec::new(); plen],
            occurrences: vec![0; slen],
            unknown_students: Vec::new(),
            unknown_projects: Vec::new(),
        };
        for &(student, project) in &solution.assignments {
            let Some(s) = assignments.index.student_index(student) else {
                assignments.unknown_students.push(student);
                continue;
            };
            let Some(p) = assignments.index.project_index(project) else {
                assignments.unknown_projects.push(project);
                continue;
            };
            assignments.occurrences[s] += 1;
            assignments.assigned[p].push(s);
            assignments.assigned_to[s].get_or_insert(p);
        }
        Ok(assignments)
    }

    pub fn index(&self) -> &InstanceIndex<'a> {
        &self.index
    }

    pub fn student(&self, s: usize) -> &'a Student {
        self.index.student(s)
    }

    pub fn project(&self, p: usize) -> &'a Project {
        self.index.project(p)
    }

    pub fn all_students(&self) -> std::ops::Range<usize> {
        0..self.assigned_to.len()
    }

    pub fn all_projects(&self) -> Vec<usize> {
        self.filter_projects(|_| true)
    }

    pub fn filter_projects<F>(&self, condition: F) -> Vec<usize>
    where
        F: Fn(usize) -> bool,
    {
        (0..self.assigned.len()).filter(|&p| condition(p)).collect()
    }

    pub fn project_for(&self, s: usize) -> Option<usize> {
        self.assigned_to[s]
    }

    pub fn students_for(&self, p: usize) -> &[usize] {
        &self.assigned[p]
    }

    pub fn size(&self, p: usize) -> usize {
        self.assigned[p].len()
    }

    pub fn is_open(&self, p: usize) -> bool {
        !self.assigned[p].is_empty()
    }

    pub fn is_acceptable(&self, p: usize) -> bool {
        self.project(p).is_acceptable(self.size(p))
    }

    pub fn occurrences(&self, s: usize) -> usize {
        self.occurrences[s]
    }

    pub fn rank_of(&self, s: usize, p: usize) -> Option<usize> {
        self.student(s).rank_of(self.project(p).id)
    }

    pub fn unassigned_students(&self) -> Vec<usize> {
        self.assigned_to
            .iter()
            .enumerate()
            .filter_map(|(s, assignment)| {
                if assignment.is_none() {
                    Some(s)
                } else {
                    None
                }
            })
            .collect()
    }

    pub fn unknown_students(&self) -> &[StudentId] {
        &self.unknown_students
    }

    pub fn unknown_projects(&self) -> &[ProjectId] {
        &self.unknown_projects
    }

    /// Members of the project with the given role minus the others.
    pub fn role_balance(&self, p: usize) -> i64 {
        self.students_for(p)
            .iter()
            .map(|&s| match self.student(s).role {
                Role::Technical => 1,
                Role::Writing => -1,
            })
            .sum()
    }

    /// Whether some member is adequately skilled in the given language.
    pub fn is_covered(&self, p: usize, l: usize) -> bool {
        self.students_for(p)
            .iter()
            .any(|&s| self.index.skill(s, l).is_adequate())
    }

    /// Whether some member has any proficiency in the given language.
    pub fn has_proficiency(&self, p: usize, l: usize) -> bool {
        self.students_for(p)
            .iter()
            .any(|&s| self.index.skill(s, l) > SkillLevel::None)
    }
}
