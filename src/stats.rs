use crate::model::{Assignments, Instance, ModelError, ProjectId, Solution};

/// Number of students assigned to their first, second, … preferred project.
pub fn statistics(a: &Assignments) -> Vec<usize> {
    let longest = a
        .all_students()
        .map(|s| a.student(s).preferred.len())
        .max()
        .unwrap_or(0);
    let mut ranks = vec![0; longest];
    for project in a.filter_projects(|p| a.is_open(p)) {
        for &student in a.students_for(project) {
            if let Some(rank) = a.rank_of(student, project) {
                ranks[rank] += 1;
            }
        }
    }
    let latest = ranks.iter().rposition(|&n| n != 0).map_or(0, |n| n + 1);
    ranks.truncate(latest);
    ranks
}

#[derive(Clone, Debug, PartialEq)]
pub struct ProjectStatistics {
    pub project: ProjectId,
    pub size: usize,
    /// Distance between the size and the optimal size.
    pub deviation: u32,
    /// Absolute difference between technical and writing members.
    pub role_imbalance: u64,
    pub covered: bool,
}

/// Quality metrics of a solution. Unassigned students are left out of every
/// per-project figure.
#[derive(Clone, Debug, PartialEq)]
pub struct Statistics {
    pub students: usize,
    pub assigned: usize,
    pub unassigned: usize,
    pub preferred: usize,
    pub disliked: usize,
    pub neutral: usize,
    pub ranks: Vec<usize>,
    pub projects: Vec<ProjectStatistics>,
    /// Open projects where every required language has an adequately skilled
    /// member.
    pub covered_projects: usize,
    /// Skill levels of assigned students in the languages their project
    /// requires.
    pub skill_used: u64,
    /// Skill levels of all students in all languages.
    pub skill_potential: u64,
}

impl Statistics {
    pub fn compute(instance: &Instance, solution: &Solution) -> Result<Statistics, ModelError> {
        Ok(Statistics::new(&Assignments::new(instance, solution)?))
    }

    pub fn new(a: &Assignments) -> Statistics {
        let students = a.all_students().len();
        let assigned = a
            .all_students()
            .filter_map(|s| a.project_for(s).map(|p| (s, p)))
            .collect::<Vec<_>>();
        let index = a.index();
        let preferred = assigned.iter().filter(|&&(s, p)| index.prefers(s, p)).count();
        let disliked = assigned.iter().filter(|&&(s, p)| index.dislikes(s, p)).count();
        let projects = a
            .all_projects()
            .into_iter()
            .map(|p| {
                let project = a.project(p);
                ProjectStatistics {
                    project: project.id,
                    size: a.size(p),
                    deviation: project.deviation(a.size(p)),
                    role_imbalance: a.role_balance(p).unsigned_abs(),
                    covered: a.is_open(p)
                        && project.required_languages().all(|l| a.is_covered(p, l)),
                }
            })
            .collect::<Vec<_>>();
        let skill_used = assigned
            .iter()
            .map(|&(s, p)| {
                a.project(p)
                    .required_languages()
                    .map(|l| u64::from(index.skill(s, l).value()))
                    .sum::<u64>()
            })
            .sum();
        let skill_potential = a
            .all_students()
            .map(|s| u64::from(a.student(s).skill_potential()))
            .sum();
        Statistics {
            students,
            assigned: assigned.len(),
            unassigned: students - assigned.len(),
            preferred,
            disliked,
            neutral: assigned.len() - preferred - disliked,
            ranks: statistics(a),
            covered_projects: projects.iter().filter(|p| p.covered).count(),
            projects,
            skill_used,
            skill_potential,
        }
    }

    /// Share of the skill potential put to use, 0 when there is none.
    pub fn utilization(&self) -> f64 {
        if self.skill_potential == 0 {
            0.0
        } else {
            self.skill_used as f64 / self.skill_potential as f64
        }
    }

    pub fn total_deviation(&self) -> u64 {
        self.projects.iter().map(|p| u64::from(p.deviation)).sum()
    }

    pub fn total_role_imbalance(&self) -> u64 {
        self.projects.iter().map(|p| p.role_imbalance).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Project, Role, SkillLevel, Student, StudentId};

    fn instance() -> Instance {
        Instance::new(
            vec![
                Student::new(StudentId(1))
                    .preferring(&[ProjectId(10), ProjectId(20)])
                    .with_skill("rust", SkillLevel::Expert)
                    .with_skill("python", SkillLevel::Beginner),
                Student::new(StudentId(2))
                    .preferring(&[ProjectId(20), ProjectId(10)])
                    .with_role(Role::Writing)
                    .with_skill("rust", SkillLevel::Beginner),
                Student::new(StudentId(3))
                    .disliking(&[ProjectId(20)])
                    .with_skill("python", SkillLevel::Intermediate),
                Student::new(StudentId(4)).with_skill("rust", SkillLevel::Intermediate),
            ],
            vec![
                Project::new(ProjectId(10), 1, 2, 3).requiring(&[true, false]),
                Project::new(ProjectId(20), 1, 2, 3).requiring(&[false, true]),
                Project::new(ProjectId(30), 0, 1, 1),
            ],
            &["rust", "python"],
        )
    }

    #[test]
    fn counts_preferences_and_balance() {
        let instance = instance();
        let solution = Solution::new(vec![
            (StudentId(1), ProjectId(20)),
            (StudentId(2), ProjectId(10)),
            (StudentId(3), ProjectId(20)),
        ]);
        let stats = Statistics::compute(&instance, &solution).unwrap();
        assert_eq!(stats.students, 4);
        assert_eq!(stats.assigned, 3);
        assert_eq!(stats.unassigned, 1);
        assert_eq!(stats.preferred, 2);
        assert_eq!(stats.disliked, 1);
        assert_eq!(stats.neutral, 0);
        assert_eq!(stats.ranks, vec![0, 2]);
        assert_eq!(
            stats.projects[0],
            ProjectStatistics {
                project: ProjectId(10),
                size: 1,
                deviation: 1,
                role_imbalance: 1,
                covered: false,
            }
        );
        assert_eq!(stats.projects[1].role_imbalance, 2);
        assert!(stats.projects[1].covered);
        assert!(!stats.projects[2].covered);
        assert_eq!(stats.covered_projects, 1);
        assert_eq!(stats.total_deviation(), 2);
        assert_eq!(stats.total_role_imbalance(), 3);
    }

    #[test]
    fn utilization_compares_used_and_available_skills() {
        let instance = instance();
        let solution = Solution::new(vec![
            (StudentId(1), ProjectId(10)),
            (StudentId(3), ProjectId(20)),
        ]);
        let stats = Statistics::compute(&instance, &solution).unwrap();
        // rust 3 for student 1, python 2 for student 3
        assert_eq!(stats.skill_used, 5);
        assert_eq!(stats.skill_potential, 3 + 1 + 1 + 2 + 2);
        assert!((stats.utilization() - 5.0 / 9.0).abs() < 1e-12);
    }

    #[test]
    fn ranks_reach_the_last_preferred_position() {
        let instance = Instance::new(
            vec![
                Student::new(StudentId(1))
                    .preferring(&[ProjectId(1), ProjectId(2), ProjectId(3)]),
                Student::new(StudentId(2)).preferring(&[ProjectId(3)]),
            ],
            vec![
                Project::new(ProjectId(1), 0, 1, 1),
                Project::new(ProjectId(2), 0, 1, 1),
                Project::new(ProjectId(3), 0, 2, 2),
            ],
            &[],
        );
        let solution = Solution::new(vec![
            (StudentId(1), ProjectId(3)),
            (StudentId(2), ProjectId(3)),
        ]);
        let stats = Statistics::compute(&instance, &solution).unwrap();
        assert_eq!(stats.ranks, vec![1, 0, 1]);
    }

    #[test]
    fn repeated_preference_is_rejected_before_counting() {
        let instance = Instance::new(
            vec![Student::new(StudentId(1)).preferring(&[
                ProjectId(1),
                ProjectId(1),
                ProjectId(2),
            ])],
            vec![
                Project::new(ProjectId(1), 0, 1, 1),
                Project::new(ProjectId(2), 0, 1, 1),
            ],
            &[],
        );
        let solution = Solution::new(vec![(StudentId(1), ProjectId(2))]);
        assert!(matches!(
            Statistics::compute(&instance, &solution),
            Err(ModelError::DuplicateChoice { .. })
        ));
    }

    #[test]
    fn empty_solution() {
        let stats = Statistics::compute(&instance(), &Solution::default()).unwrap();
        assert_eq!(stats.assigned, 0);
        assert!(stats.ranks.is_empty());
        assert_eq!(stats.covered_projects, 0);
        assert_eq!(stats.skill_used, 0);
    }

    #[test]
    fn computing_twice_gives_identical_numbers() {
        let instance = instance();
        let solution = Solution::new(vec![(StudentId(4), ProjectId(10))]);
        assert_eq!(
            Statistics::compute(&instance, &solution).unwrap(),
            Statistics::compute(&instance, &solution).unwrap()
        );
    }
}
