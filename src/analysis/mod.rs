pub mod fit;
pub mod skills;

use std::collections::HashMap;

use eyre::Result;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::models::job::JobPosting;

use self::skills::{ExperienceLevel, SkillCategory, SkillExtractor};

/// Everything the regex pass could learn about a single posting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobAnalysis {
    pub job_id: String,
    pub title: String,
    pub company: String,
    pub required_skills: Vec<String>,
    pub preferred_skills: Vec<String>,
    pub responsibilities: Vec<String>,
    pub complexity_score: f64,
    pub experience_level: ExperienceLevel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub total_jobs: usize,
    pub average_complexity: f64,
    pub most_common_level: ExperienceLevel,
    pub skill_frequency: HashMap<String, u64>,
    pub top_skills: Vec<(String, u64)>,
    pub category_breakdown: HashMap<SkillCategory, Vec<String>>,
    pub total_unique_skills: usize,
}

pub struct Analyzer {
    extractor: SkillExtractor,
}

impl Analyzer {
    pub fn new() -> Result<Self> {
        Ok(Self {
            extractor: SkillExtractor::new()?,
        })
    }

    pub fn analyze(&self, posting: &JobPosting) -> JobAnalysis {
        let analysis = JobAnalysis {
            job_id: posting.id.clone(),
            title: posting.title.clone(),
            company: posting.company.clone(),
            required_skills: self.extractor.required_skills(&posting.description),
            preferred_skills: self.extractor.preferred_skills(&posting.description),
            responsibilities: self.extractor.responsibilities(&posting.description),
            complexity_score: skills::complexity_score(&posting.description),
            experience_level: skills::experience_level(&posting.description),
        };

        debug!(
            "analyzed '{}' at {}: {} required, {} preferred skills",
            analysis.title,
            analysis.company,
            analysis.required_skills.len(),
            analysis.preferred_skills.len()
        );

        analysis
    }

    pub fn analyze_all(&self, postings: &[JobPosting]) -> Vec<JobAnalysis> {
        let analyses: Vec<JobAnalysis> = postings.iter().map(|p| self.analyze(p)).collect();
        info!("analyzed {} job descriptions", analyses.len());
        analyses
    }
}

/// Aggregates per-job analyses into cross-job statistics. All averages are
/// guarded against empty input.
pub fn summarize(analyses: &[JobAnalysis]) -> AnalysisSummary {
    let total_jobs = analyses.len();

    let average_complexity = if total_jobs == 0 {
        0.0
    } else {
        let sum: f64 = analyses.iter().map(|a| a.complexity_score).sum();
        (sum / total_jobs as f64 * 100.0).round() / 100.0
    };

    let mut level_counts: HashMap<ExperienceLevel, u64> = HashMap::new();
    for analysis in analyses {
        *level_counts.entry(analysis.experience_level).or_default() += 1;
    }
    let most_common_level = level_counts
        .into_iter()
        .max_by_key(|(_, count)| *count)
        .map(|(level, _)| level)
        .unwrap_or(ExperienceLevel::Unknown);

    let mut skill_frequency: HashMap<String, u64> = HashMap::new();
    for analysis in analyses {
        for skill in analysis
            .required_skills
            .iter()
            .chain(analysis.preferred_skills.iter())
        {
            *skill_frequency.entry(skill.clone()).or_default() += 1;
        }
    }

    let mut top_skills: Vec<(String, u64)> = skill_frequency
        .iter()
        .map(|(skill, count)| (skill.clone(), *count))
        .collect();
    top_skills.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    top_skills.truncate(10);

    let unique_skills: Vec<String> = skill_frequency.keys().cloned().collect();
    let category_breakdown = skills::categorize_all(&unique_skills);
    let total_unique_skills = skill_frequency.len();

    AnalysisSummary {
        total_jobs,
        average_complexity,
        most_common_level,
        skill_frequency,
        top_skills,
        category_breakdown,
        total_unique_skills,
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use crate::models::job::JobSource;

    use super::*;

    fn posting(id: &str, description: &str) -> JobPosting {
        JobPosting {
            id: id.to_string(),
            title: format!("Job {id}"),
            company: "Acme".to_string(),
            location: "Remote".to_string(),
            url: None,
            salary: None,
            description: description.to_string(),
            source: JobSource::General,
            posted_at: Utc::now(),
            synthetic: false,
        }
    }

    #[test]
    fn summary_of_nothing_has_no_division_by_zero() {
        let summary = summarize(&[]);
        assert_eq!(summary.total_jobs, 0);
        assert_eq!(summary.average_complexity, 0.0);
        assert_eq!(summary.most_common_level, ExperienceLevel::Unknown);
        assert!(summary.top_skills.is_empty());
    }

    #[test]
    fn summary_counts_skill_frequency_across_jobs() {
        let analyzer = Analyzer::new().unwrap();
        let postings = vec![
            posting("1", "Required: python and docker."),
            posting("2", "Required: python.\nPreferred: aws."),
        ];

        let analyses = analyzer.analyze_all(&postings);
        let summary = summarize(&analyses);

        assert_eq!(summary.total_jobs, 2);
        assert_eq!(summary.skill_frequency.get("python"), Some(&2));
        assert_eq!(summary.skill_frequency.get("docker"), Some(&1));
        assert_eq!(summary.top_skills[0].0, "python");
    }

    #[test]
    fn summary_breaks_skills_down_by_category() {
        let analyzer = Analyzer::new().unwrap();
        let postings = vec![posting(
            "1",
            "Required: python, postgresql and docker on aws.",
        )];

        let summary = summarize(&analyzer.analyze_all(&postings));
        let breakdown = &summary.category_breakdown;

        assert!(
            breakdown[&SkillCategory::ProgrammingLanguages].contains(&"python".to_string())
        );
        assert!(breakdown[&SkillCategory::Databases].contains(&"postgresql".to_string()));
        assert!(breakdown[&SkillCategory::Tools].contains(&"docker".to_string()));
        assert!(breakdown[&SkillCategory::CloudPlatforms].contains(&"aws".to_string()));
    }
}
