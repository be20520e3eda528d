use crate::model::{Instance, ModelError, Project, ProjectId, SkillLevel, Student, StudentId};
use std::collections::HashMap;

/// Dense view of an instance: students, projects and languages are addressed
/// by their position (starting at 0 and without gaps) instead of their ids.
/// Building the index checks every structural invariant of the instance.
#[derive(Debug)]
pub struct InstanceIndex<'a> {
    instance: &'a Instance,
    students: HashMap<StudentId, usize>,
    projects: HashMap<ProjectId, usize>,
    skills: Vec<Vec<SkillLevel>>,
}

fn check_project(project: &Project, languages: usize) -> Result<(), ModelError> {
    if project.min > project.max {
        return Err(ModelError::InvalidCapacity {
            project: project.id,
            min: project.min,
            max: project.max,
        });
    }
    if project.opt < project.min || project.opt > project.max {
        return Err(ModelError::InvalidOptimum {
            project: project.id,
            min: project.min,
            opt: project.opt,
            max: project.max,
        });
    }
    if project.role_ratio > 100 {
        return Err(ModelError::InvalidRoleRatio {
            project: project.id,
            ratio: project.role_ratio,
        });
    }
    if project.skill_requirements.len() > languages {
        return Err(ModelError::UnknownRequirement {
            project: project.id,
            requirements: project.skill_requirements.len(),
            languages,
        });
    }
    Ok(())
}

fn check_choices(
    student: &Student,
    projects: &HashMap<ProjectId, usize>,
) -> Result<(), ModelError> {
    for &project in student.preferred.iter().chain(&student.disliked) {
        if !projects.contains_key(&project) {
            return Err(ModelError::UnknownProject {
                student: student.id,
                project,
            });
        }
    }
    for choices in [&student.preferred, &student.disliked] {
        if let Some((_, &project)) = choices
            .iter()
            .enumerate()
            .find(|&(i, p)| choices[..i].contains(p))
        {
            return Err(ModelError::DuplicateChoice {
                student: student.id,
                project,
            });
        }
    }
    if let Some(&project) = student.preferred.iter().find(|&&p| student.dislikes(p)) {
        return Err(ModelError::ConflictingChoice {
            student: student.id,
            project,
        });
    }
    Ok(())
}

impl<'a> InstanceIndex<'a> {
    pub fn new(instance: &'a Instance) -> Result<InstanceIndex<'a>, ModelError> {
        let mut languages = HashMap::new();
        for (l, language) in instance.languages.iter().enumerate() {
            if languages.insert(language.as_str(), l).is_some() {
                return Err(ModelError::DuplicateLanguage(language.clone()));
            }
        }
        let mut projects = HashMap::new();
        for (p, project) in instance.projects.iter().enumerate() {
            if projects.insert(project.id, p).is_some() {
                return Err(ModelError::DuplicateProject(project.id));
            }
            check_project(project, languages.len())?;
        }
        let mut students = HashMap::new();
        let mut skills = Vec::with_capacity(instance.students.len());
        for (s, student) in instance.students.iter().enumerate() {
            if students.insert(student.id, s).is_some() {
                return Err(ModelError::DuplicateStudent(student.id));
            }
            check_choices(student, &projects)?;
            let mut levels = vec![SkillLevel::None; languages.len()];
            for (language, &level) in &student.skills {
                let l = languages.get(language.as_str()).ok_or_else(|| {
                    ModelError::UnknownLanguage {
                        student: student.id,
                        language: language.clone(),
                    }
                })?;
                levels[*l] = level;
            }
            skills.push(levels);
        }
        Ok(InstanceIndex {
            instance,
            students,
            projects,
            skills,
        })
    }

    pub fn instance(&self) -> &'a Instance {
        self.instance
    }

    pub fn students(&self) -> &'a [Student] {
        &self.instance.students
    }

    pub fn projects(&self) -> &'a [Project] {
        &self.instance.projects
    }

    pub fn languages(&self) -> &'a [String] {
        &self.instance.languages
    }

    pub fn student(&self, s: usize) -> &'a Student {
        &self.instance.students[s]
    }

    pub fn project(&self, p: usize) -> &'a Project {
        &self.instance.projects[p]
    }

    pub fn student_index(&self, id: StudentId) -> Option<usize> {
        self.students.get(&id).copied()
    }

    pub fn project_index(&self, id: ProjectId) -> Option<usize> {
        self.projects.get(&id).copied()
    }

    pub fn skill(&self, s: usize, l: usize) -> SkillLevel {
        self.skills[s][l]
    }

    pub fn prefers(&self, s: usize, p: usize) -> bool {
        self.student(s).prefers(self.project(p).id)
    }

    pub fn dislikes(&self, s: usize, p: usize) -> bool {
        self.student(s).dislikes(self.project(p).id)
    }

    /// Whether the student has any proficiency in a language the project
    /// requires.
    pub fn is_relevant(&self, s: usize, p: usize) -> bool {
        self.project(p)
            .required_languages()
            .any(|l| self.skill(s, l) > SkillLevel::None)
    }
}
