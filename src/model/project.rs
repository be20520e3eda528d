use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Deserialize, Serialize)]
#[serde(transparent)]
pub struct ProjectId(pub u64);

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn default_role_ratio() -> u8 {
    50
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Project {
    pub id: ProjectId,
    #[serde(default)]
    pub name: String,
    pub min: u32,
    pub opt: u32,
    pub max: u32,
    /// Target percentage of technical members. Advisory only.
    #[serde(default = "default_role_ratio")]
    pub role_ratio: u8,
    /// Required languages, aligned with the instance language list.
    #[serde(default, alias = "language_requirements")]
    pub skill_requirements: Vec<bool>,
}

impl Project {
    pub fn new(id: ProjectId, min: u32, opt: u32, max: u32) -> Project {
        Project {
            id,
            name: String::new(),
            min,
            opt,
            max,
            role_ratio: default_role_ratio(),
            skill_requirements: Vec::new(),
        }
    }

    pub fn named(mut self, name: &str) -> Project {
        self.name = name.to_owned();
        self
    }

    pub fn requiring(mut self, requirements: &[bool]) -> Project {
        self.skill_requirements = requirements.to_vec();
        self
    }

    pub fn requires(&self, language: usize) -> bool {
        self.skill_requirements
            .get(language)
            .copied()
            .unwrap_or(false)
    }

    pub fn required_languages(&self) -> impl Iterator<Item = usize> + '_ {
        self.skill_requirements
            .iter()
            .enumerate()
            .filter_map(|(l, &required)| if required { Some(l) } else { None })
    }

    pub fn is_acceptable(&self, n: usize) -> bool {
        self.min as usize <= n && n <= self.max as usize
    }

    pub fn deviation(&self, n: usize) -> u32 {
        (n as i64 - i64::from(self.opt)).unsigned_abs() as u32
    }

    pub fn label(&self) -> String {
        if self.name.is_empty() {
            format!("#{}", self.id)
        } else {
            self.name.clone()
        }
    }
}

#[test]
fn test_acceptable_and_deviation() {
    let p = Project::new(ProjectId(0), 2, 4, 6).requiring(&[false, true]);
    assert!(!p.is_acceptable(1));
    assert!(p.is_acceptable(2));
    assert!(p.is_acceptable(6));
    assert!(!p.is_acceptable(7));
    assert_eq!(p.deviation(1), 3);
    assert_eq!(p.deviation(6), 2);
    assert!(p.requires(1));
    assert!(!p.requires(0));
    assert!(!p.requires(5));
    assert_eq!(p.required_languages().collect::<Vec<_>>(), vec![1]);
    assert_eq!(p.label(), "#0");
    assert_eq!(p.named("Compiler").label(), "Compiler");
}
