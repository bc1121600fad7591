use std::collections::HashMap;
use std::fmt;

use eyre::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillCategory {
    ProgrammingLanguages,
    Frameworks,
    Databases,
    CloudPlatforms,
    Tools,
    Methodologies,
    Other,
}

impl SkillCategory {
    pub fn label(&self) -> &'static str {
        match self {
            SkillCategory::ProgrammingLanguages => "programming_languages",
            SkillCategory::Frameworks => "frameworks",
            SkillCategory::Databases => "databases",
            SkillCategory::CloudPlatforms => "cloud_platforms",
            SkillCategory::Tools => "tools",
            SkillCategory::Methodologies => "methodologies",
            SkillCategory::Other => "other",
        }
    }
}

impl fmt::Display for SkillCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

const PROGRAMMING_LANGUAGES: &[&str] = &[
    "python", "java", "javascript", "typescript", "c++", "c#", "go", "rust", "php", "ruby",
    "swift", "kotlin", "scala", "r", "matlab", "sql", "html", "css", "bash", "powershell",
];

const FRAMEWORKS: &[&str] = &[
    "react", "angular", "vue", "node.js", "django", "flask", "spring", "express", "laravel",
    "asp.net", "tensorflow", "pytorch", "scikit-learn", "pandas", "numpy", "jquery",
];

const DATABASES: &[&str] = &[
    "mysql", "postgresql", "mongodb", "redis", "elasticsearch", "cassandra", "dynamodb",
    "sqlite", "oracle", "sql server", "firebase", "supabase",
];

const CLOUD_PLATFORMS: &[&str] = &[
    "aws", "azure", "gcp", "heroku", "digitalocean", "linode", "vultr", "cloudflare",
];

const TOOLS: &[&str] = &[
    "git", "docker", "kubernetes", "jenkins", "github actions", "gitlab ci", "jira",
    "confluence", "slack", "teams", "zoom", "figma", "adobe creative suite",
];

const METHODOLOGIES: &[&str] = &[
    "agile", "scrum", "kanban", "waterfall", "devops", "ci/cd", "tdd", "bdd", "lean",
];

const TAXONOMY: &[(SkillCategory, &[&str])] = &[
    (SkillCategory::ProgrammingLanguages, PROGRAMMING_LANGUAGES),
    (SkillCategory::Frameworks, FRAMEWORKS),
    (SkillCategory::Databases, DATABASES),
    (SkillCategory::CloudPlatforms, CLOUD_PLATFORMS),
    (SkillCategory::Tools, TOOLS),
    (SkillCategory::Methodologies, METHODOLOGIES),
];

pub fn categorize(skill: &str) -> SkillCategory {
    let skill = skill.to_lowercase();
    for (category, skills) in TAXONOMY {
        if skills.contains(&skill.as_str()) {
            return *category;
        }
    }
    SkillCategory::Other
}

/// Matches known taxonomy skills inside a fragment of text.
pub fn skills_in_text(text: &str) -> Vec<String> {
    let text = text.to_lowercase();
    let mut found = Vec::new();
    for (_, skills) in TAXONOMY {
        for skill in *skills {
            if contains_token(&text, skill) && !found.iter().any(|s| s == skill) {
                found.push(skill.to_string());
            }
        }
    }
    found
}

/// Substring match that refuses to fire inside a larger word. Needed because
/// taxonomy entries like "r" and "go" appear inside most English words.
fn contains_token(text: &str, token: &str) -> bool {
    let mut start = 0;
    while let Some(pos) = text[start..].find(token) {
        let abs = start + pos;
        let before_ok = text[..abs]
            .chars()
            .next_back()
            .is_none_or(|c| !c.is_alphanumeric());
        let after_ok = text[abs + token.len()..]
            .chars()
            .next()
            .is_none_or(|c| !c.is_alphanumeric());
        if before_ok && after_ok {
            return true;
        }
        start = abs + token.len();
    }
    false
}

/// Regex-based skill and requirement extraction from a job description.
pub struct SkillExtractor {
    required: Vec<Regex>,
    preferred: Vec<Regex>,
    responsibilities: Vec<Regex>,
}

impl SkillExtractor {
    pub fn new() -> Result<Self> {
        let compile = |headers: &[&str]| -> Result<Vec<Regex>> {
            headers
                .iter()
                .map(|h| Ok(Regex::new(&format!(r"(?i){h}[:\s]+([^.\n]+)"))?))
                .collect()
        };

        Ok(Self {
            required: compile(&["required", "must have", "requirements", "qualifications"])?,
            preferred: compile(&["preferred", "nice to have", "bonus", "plus"])?,
            responsibilities: compile(&[
                "responsibilities",
                "duties",
                "what you'll do",
                "key responsibilities",
            ])?,
        })
    }

    /// Skills named after a "required" style header. A description with no
    /// such section yields an empty list, never an error.
    pub fn required_skills(&self, description: &str) -> Vec<String> {
        Self::section_skills(&self.required, description)
    }

    pub fn preferred_skills(&self, description: &str) -> Vec<String> {
        Self::section_skills(&self.preferred, description)
    }

    pub fn responsibilities(&self, description: &str) -> Vec<String> {
        let mut lines = Vec::new();
        for re in &self.responsibilities {
            for caps in re.captures_iter(description) {
                if let Some(m) = caps.get(1) {
                    lines.push(m.as_str().trim().to_string());
                }
            }
        }
        lines
    }

    fn section_skills(patterns: &[Regex], description: &str) -> Vec<String> {
        let mut skills: Vec<String> = Vec::new();
        for re in patterns {
            for caps in re.captures_iter(description) {
                if let Some(m) = caps.get(1) {
                    for skill in skills_in_text(m.as_str()) {
                        if !skills.contains(&skill) {
                            skills.push(skill);
                        }
                    }
                }
            }
        }
        skills
    }
}

/// Heuristic 0-10 difficulty score for a job description. Seniority and
/// leadership language push the score up, entry-level language pulls it down.
pub fn complexity_score(description: &str) -> f64 {
    if description.is_empty() {
        return 0.0;
    }

    const HARD: &[&str] = &[
        "senior", "lead", "principal", "architect", "expert", "advanced", "complex",
        "challenging", "strategic", "leadership", "management", "mentor", "coach", "guide",
        "oversee", "coordinate",
    ];
    const EASY: &[&str] = &[
        "entry", "junior", "basic", "simple", "routine", "assist", "support", "learn",
        "training", "guidance", "supervision",
    ];

    let lower = description.to_lowercase();
    let mut score = 5.0;
    score += HARD.iter().map(|w| lower.matches(w).count() as f64 * 0.1).sum::<f64>();
    score -= EASY.iter().map(|w| lower.matches(w).count() as f64 * 0.05).sum::<f64>();

    (score.clamp(0.0, 10.0) * 100.0).round() / 100.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperienceLevel {
    EntryLevel,
    MidLevel,
    SeniorLevel,
    Management,
    Unknown,
}

impl ExperienceLevel {
    pub fn label(&self) -> &'static str {
        match self {
            ExperienceLevel::EntryLevel => "entry_level",
            ExperienceLevel::MidLevel => "mid_level",
            ExperienceLevel::SeniorLevel => "senior_level",
            ExperienceLevel::Management => "management",
            ExperienceLevel::Unknown => "unknown",
        }
    }
}

pub fn experience_level(description: &str) -> ExperienceLevel {
    if description.is_empty() {
        return ExperienceLevel::Unknown;
    }

    let lower = description.to_lowercase();
    let levels: [(ExperienceLevel, &[&str]); 4] = [
        (
            ExperienceLevel::EntryLevel,
            &["entry", "junior", "0-2", "1-2", "2+", "recent graduate", "new grad"],
        ),
        (
            ExperienceLevel::MidLevel,
            &["mid", "intermediate", "3-5", "4-6", "5+", "experienced"],
        ),
        (
            ExperienceLevel::SeniorLevel,
            &["senior", "lead", "principal", "6+", "8+", "10+", "expert"],
        ),
        (
            ExperienceLevel::Management,
            &["manager", "director", "head", "vp", "cto", "leadership"],
        ),
    ];

    for (level, indicators) in levels {
        if indicators.iter().any(|i| lower.contains(i)) {
            return level;
        }
    }

    ExperienceLevel::Unknown
}

/// Per-category breakdown of a skill set.
pub fn categorize_all(skills: &[String]) -> HashMap<SkillCategory, Vec<String>> {
    let mut breakdown: HashMap<SkillCategory, Vec<String>> = HashMap::new();
    for skill in skills {
        breakdown.entry(categorize(skill)).or_default().push(skill.clone());
    }
    breakdown
}
