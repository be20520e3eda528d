use super::ProjectId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Deserialize, Serialize)]
#[serde(transparent)]
pub struct StudentId(pub u64);

impl fmt::Display for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The kind of contribution a student brings to a project. Reads either
/// the name or the numeric code (0 technical, 1 writing).
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase", try_from = "RoleRepr")]
pub enum Role {
    #[default]
    Technical,
    Writing,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RoleRepr {
    Code(u8),
    Name(String),
}

impl TryFrom<RoleRepr> for Role {
    type Error = String;

    fn try_from(repr: RoleRepr) -> Result<Self, Self::Error> {
        match repr {
            RoleRepr::Code(0) => Ok(Role::Technical),
            RoleRepr::Code(1) => Ok(Role::Writing),
            RoleRepr::Code(other) => Err(format!("role code must be 0 or 1, got {other}")),
            RoleRepr::Name(name) => match name.as_str() {
                "technical" | "programmer" => Ok(Role::Technical),
                "writing" | "writer" => Ok(Role::Writing),
                _ => Err(format!("unknown role `{name}`")),
            },
        }
    }
}

impl Role {
    /// Sign used when balancing roles: technical members count positively,
    /// writing members negatively.
    pub fn sign(self) -> f64 {
        match self {
            Role::Technical => 1.0,
            Role::Writing => -1.0,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd, Deserialize, Serialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum SkillLevel {
    #[default]
    None = 0,
    Beginner = 1,
    Intermediate = 2,
    Expert = 3,
}

impl SkillLevel {
    pub fn value(self) -> u32 {
        self as u32
    }

    /// Intermediate or better, the level at which a member covers a
    /// required language.
    pub fn is_adequate(self) -> bool {
        self >= SkillLevel::Intermediate
    }
}

impl TryFrom<u8> for SkillLevel {
    type Error = String;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        match level {
            0 => Ok(SkillLevel::None),
            1 => Ok(SkillLevel::Beginner),
            2 => Ok(SkillLevel::Intermediate),
            3 => Ok(SkillLevel::Expert),
            other => Err(format!("skill level must be between 0 and 3, got {other}")),
        }
    }
}

impl From<SkillLevel> for u8 {
    fn from(level: SkillLevel) -> u8 {
        level as u8
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Student {
    pub id: StudentId,
    #[serde(default, alias = "projects")]
    pub preferred: Vec<ProjectId>,
    #[serde(default, alias = "negatives")]
    pub disliked: Vec<ProjectId>,
    #[serde(default, alias = "skill")]
    pub role: Role,
    #[serde(default, alias = "programing_skills")]
    pub skills: BTreeMap<String, SkillLevel>,
}

impl Student {
    pub fn new(id: StudentId) -> Student {
        Student {
            id,
            preferred: Vec::new(),
            disliked: Vec::new(),
            role: Role::default(),
            skills: BTreeMap::new(),
        }
    }

    pub fn preferring(mut self, projects: &[ProjectId]) -> Student {
        self.preferred.extend_from_slice(projects);
        self
    }

    pub fn disliking(mut self, projects: &[ProjectId]) -> Student {
        self.disliked.extend_from_slice(projects);
        self
    }

    pub fn with_role(mut self, role: Role) -> Student {
        self.role = role;
        self
    }

    pub fn with_skill(mut self, language: &str, level: SkillLevel) -> Student {
        self.skills.insert(language.to_owned(), level);
        self
    }

    pub fn rank_of(&self, project: ProjectId) -> Option<usize> {
        self.preferred.iter().position(|&p| p == project)
    }

    pub fn prefers(&self, project: ProjectId) -> bool {
        self.preferred.contains(&project)
    }

    pub fn dislikes(&self, project: ProjectId) -> bool {
        self.disliked.contains(&project)
    }

    pub fn skill(&self, language: &str) -> SkillLevel {
        self.skills.get(language).copied().unwrap_or_default()
    }

    /// Sum of all skill levels, whatever the language.
    pub fn skill_potential(&self) -> u32 {
        self.skills.values().map(|l| l.value()).sum()
    }
}
