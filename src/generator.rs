//! Random instances for testing and benchmarking.

use crate::model::{Instance, Project, ProjectId, Role, SkillLevel, Student, StudentId};
use rand::prelude::*;
use tracing::debug;

#[derive(Clone, Debug, clap::Args)]
pub struct GeneratorParams {
    /// Number of students
    #[arg(long, default_value_t = 60)]
    pub students: usize,
    /// Number of projects
    #[arg(long, default_value_t = 8)]
    pub projects: usize,
    /// Preferred projects per student
    #[arg(long, default_value_t = 3)]
    pub preferred: usize,
    /// Disliked projects per student
    #[arg(long, default_value_t = 1)]
    pub disliked: usize,
    /// Known languages
    #[arg(long, value_delimiter = ',', default_value = "c,java,python,rust")]
    pub languages: Vec<String>,
    /// Probability for a project to require each language
    #[arg(long, default_value_t = 0.25, value_parser = parse_probability)]
    pub requirement_probability: f64,
}

fn parse_probability(arg: &str) -> Result<f64, String> {
    let probability = arg.parse::<f64>().map_err(|e| e.to_string())?;
    if (0.0..=1.0).contains(&probability) {
        Ok(probability)
    } else {
        Err(format!("{arg} is not a probability between 0 and 1"))
    }
}

impl Default for GeneratorParams {
    fn default() -> GeneratorParams {
        GeneratorParams {
            students: 60,
            projects: 8,
            preferred: 3,
            disliked: 1,
            languages: ["c", "java", "python", "rust"]
                .into_iter()
                .map(String::from)
                .collect(),
            requirement_probability: 0.25,
        }
    }
}

const LEVELS: [SkillLevel; 4] = [
    SkillLevel::None,
    SkillLevel::Beginner,
    SkillLevel::Intermediate,
    SkillLevel::Expert,
];

/// Projects get a minimum between 3 and 7, a maximum 4 above it and an
/// optimum in between. Preferred and disliked projects of a student are
/// distinct; choices are truncated when there are not enough projects.
pub fn generate(params: &GeneratorParams, rng: &mut impl Rng) -> Instance {
    let probability = if params.requirement_probability.is_nan() {
        0.0
    } else {
        params.requirement_probability.clamp(0.0, 1.0)
    };
    let projects = (0..params.projects)
        .map(|i| {
            let min = rng.random_range(3..=7);
            let max = min + 4;
            let opt = rng.random_range(min..=max);
            let requirements = params
                .languages
                .iter()
                .map(|_| rng.random_bool(probability))
                .collect::<Vec<_>>();
            Project::new(ProjectId(i as u64), min, opt, max)
                .named(&format!("Project {}", i + 1))
                .requiring(&requirements)
        })
        .collect::<Vec<_>>();
    let ids = projects.iter().map(|p| p.id).collect::<Vec<_>>();
    let students = (0..params.students)
        .map(|i| {
            let mut choices = ids.clone();
            choices.shuffle(rng);
            let preferred = params.preferred.min(choices.len());
            let disliked = params.disliked.min(choices.len() - preferred);
            let mut student = Student::new(StudentId(i as u64))
                .preferring(&choices[..preferred])
                .disliking(&choices[preferred..preferred + disliked])
                .with_role(if rng.random_bool(0.5) {
                    Role::Technical
                } else {
                    Role::Writing
                });
            for language in &params.languages {
                let level = LEVELS[rng.random_range(0..LEVELS.len())];
                if level > SkillLevel::None {
                    student = student.with_skill(language, level);
                }
            }
            student
        })
        .collect::<Vec<_>>();
    debug!(
        students = students.len(),
        projects = projects.len(),
        "random instance generated"
    );
    let languages = params.languages.iter().map(String::as_str).collect::<Vec<_>>();
    Instance::new(students, projects, &languages)
}

pub fn generate_seeded(params: &GeneratorParams, seed: u64) -> Instance {
    generate(params, &mut StdRng::seed_from_u64(seed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_instances_are_valid() {
        for seed in 0..5 {
            let instance = generate_seeded(&GeneratorParams::default(), seed);
            assert_eq!(instance.students.len(), 60);
            assert_eq!(instance.projects.len(), 8);
            assert_eq!(instance.validate(), Ok(()));
            for project in &instance.projects {
                assert!((3..=7).contains(&project.min));
                assert_eq!(project.max, project.min + 4);
                assert!(project.is_acceptable(project.opt as usize));
            }
            for student in &instance.students {
                assert_eq!(student.preferred.len(), 3);
                assert_eq!(student.disliked.len(), 1);
            }
        }
    }

    #[test]
    fn same_seed_same_instance() {
        let params = GeneratorParams::default();
        assert_eq!(generate_seeded(&params, 42), generate_seeded(&params, 42));
    }

    #[test]
    fn probability_must_lie_between_0_and_1() {
        assert_eq!(parse_probability("0.5"), Ok(0.5));
        assert_eq!(parse_probability("1"), Ok(1.0));
        assert!(parse_probability("NaN").is_err());
        assert!(parse_probability("inf").is_err());
        assert!(parse_probability("-0.1").is_err());
        assert!(parse_probability("often").is_err());
        let params = GeneratorParams {
            requirement_probability: f64::NAN,
            ..GeneratorParams::default()
        };
        let instance = generate_seeded(&params, 1);
        assert!(
            instance
                .projects
                .iter()
                .all(|p| p.required_languages().next().is_none())
        );
    }

    #[test]
    fn choices_are_truncated() {
        let params = GeneratorParams {
            projects: 2,
            preferred: 3,
            disliked: 1,
            ..GeneratorParams::default()
        };
        let instance = generate_seeded(&params, 7);
        for student in &instance.students {
            assert_eq!(student.preferred.len(), 2);
            assert!(student.disliked.is_empty());
        }
    }
}
