use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobSource {
    LinkedIn,
    Glassdoor,
    Indeed,
    General,
}

impl JobSource {
    pub const ALL: [JobSource; 4] = [
        JobSource::LinkedIn,
        JobSource::Glassdoor,
        JobSource::Indeed,
        JobSource::General,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            JobSource::LinkedIn => "linkedin",
            JobSource::Glassdoor => "glassdoor",
            JobSource::Indeed => "indeed",
            JobSource::General => "general",
        }
    }
}

impl fmt::Display for JobSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobPosting {
    pub id: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub url: Option<String>,
    pub salary: Option<String>,
    pub description: String,
    pub source: JobSource,
    pub posted_at: DateTime<Utc>,
    /// Fabricated fallback data. Never eligible for auto-apply.
    #[serde(default)]
    pub synthetic: bool,
}

impl JobPosting {
    /// Case-insensitive (title, company) identity used for deduplication.
    pub fn dedup_key(&self) -> String {
        format!(
            "{}|{}",
            self.title.trim().to_lowercase(),
            self.company.trim().to_lowercase()
        )
    }
}

/// Removes duplicate postings by (title, company), keeping the first
/// occurrence. Postings with neither a title nor a company are dropped.
pub fn dedup_postings(postings: Vec<JobPosting>) -> Vec<JobPosting> {
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(postings.len());

    for posting in postings {
        let key = posting.dedup_key();
        if key != "|" && seen.insert(key) {
            unique.push(posting);
        }
    }

    unique
}
