use std::collections::HashMap;

use eyre::Result;
use log::debug;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::analysis::skills;

const SECTION_HEADERS: &[(&str, &[&str])] = &[
    ("summary", &["summary", "objective", "about me", "profile"]),
    ("skills", &["skills", "technical skills", "competencies"]),
    (
        "experience",
        &["experience", "work experience", "employment history"],
    ),
    ("education", &["education", "academic background"]),
    ("projects", &["projects", "portfolio"]),
    ("certifications", &["certifications", "licenses"]),
    ("awards", &["awards", "honors"]),
    ("contact", &["contact", "contact information"]),
];

/// Structured view of a resume's plain text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumeProfile {
    pub raw: String,
    pub sections: HashMap<String, String>,
    pub skills: Vec<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub word_count: usize,
}

impl ResumeProfile {
    pub fn parse(content: &str) -> Result<Self> {
        let sections = split_sections(content);

        // Skills anywhere in the document count, not just under the header.
        let skills = skills::skills_in_text(content);

        let email_re = Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}")?;
        let phone_re = Regex::new(r"\+?\d[\d\s().-]{7,}\d")?;

        let email = email_re.find(content).map(|m| m.as_str().to_string());
        let phone = phone_re.find(content).map(|m| m.as_str().trim().to_string());

        let profile = Self {
            raw: content.to_string(),
            word_count: content.split_whitespace().count(),
            sections,
            skills,
            email,
            phone,
        };

        debug!(
            "parsed resume: {} words, {} sections, {} known skills",
            profile.word_count,
            profile.sections.len(),
            profile.skills.len()
        );

        Ok(profile)
    }

    pub fn section(&self, name: &str) -> Option<&str> {
        self.sections.get(name).map(String::as_str)
    }
}

/// A header line is short and matches one of the known section keywords.
fn section_for_header(line: &str) -> Option<&'static str> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.len() >= 50 {
        return None;
    }

    let lower = trimmed.trim_end_matches(':').to_lowercase();
    for (section, keywords) in SECTION_HEADERS {
        if keywords.iter().any(|k| lower == *k) {
            return Some(section);
        }
    }
    None
}

fn split_sections(content: &str) -> HashMap<String, String> {
    let mut sections: HashMap<String, Vec<&str>> = HashMap::new();
    let mut current: Option<&'static str> = None;

    for line in content.lines() {
        if let Some(section) = section_for_header(line) {
            current = Some(section);
            sections.entry(section.to_string()).or_default();
        } else if let Some(section) = current {
            sections.entry(section.to_string()).or_default().push(line);
        }
    }

    sections
        .into_iter()
        .map(|(name, lines)| (name, lines.join("\n").trim().to_string()))
        .collect()
}
