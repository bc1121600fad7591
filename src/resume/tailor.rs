use serde::{Deserialize, Serialize};

use crate::analysis::JobAnalysis;

use super::profile::ResumeProfile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TailorSource {
    Llm,
    Heuristic,
}

/// Output of tailoring a resume towards one posting. The LLM fills this
/// directly; the heuristic path builds a minimal version of it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TailoredResume {
    pub job_id: String,
    pub summary: String,
    pub technical_skills: Vec<String>,
    pub keywords_added: Vec<String>,
    pub modifications: Vec<String>,
    #[serde(default = "default_source")]
    pub source: TailorSource,
}

fn default_source() -> TailorSource {
    TailorSource::Llm
}

/// Bookkeeping for a rewrite pass.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ModificationSummary {
    pub planned: usize,
    pub applied: usize,
}

impl ModificationSummary {
    /// Fraction of planned modifications that landed. 0.0 when nothing was
    /// planned, never a division by zero.
    pub fn success_rate(&self) -> f64 {
        if self.planned == 0 {
            0.0
        } else {
            self.applied as f64 / self.planned as f64
        }
    }
}

impl TailoredResume {
    /// Rewrites the resume text with the tailored summary on top and the
    /// added keywords folded into a skills line.
    pub fn apply_to(&self, profile: &ResumeProfile) -> (String, ModificationSummary) {
        let mut planned = 0;
        let mut applied = 0;
        let mut text = profile.raw.clone();

        if !self.summary.is_empty() {
            planned += 1;
            text = format!("Summary\n{}\n\n{}", self.summary, text.trim_start());
            applied += 1;
        }

        if !self.keywords_added.is_empty() {
            planned += 1;
            if !text.ends_with('\n') {
                text.push('\n');
            }
            text.push_str(&format!(
                "\nAdditional skills: {}\n",
                self.keywords_added.join(", ")
            ));
            applied += 1;
        }

        (text, ModificationSummary { planned, applied })
    }
}

/// Keyword-level tailoring used when no LLM is configured or the LLM call
/// fails. Surfaces the posting's required skills the resume already has and
/// folds in up to five missing ones as keywords to work into the text.
pub fn heuristic_tailor(profile: &ResumeProfile, analysis: &JobAnalysis) -> TailoredResume {
    let have: Vec<&String> = analysis
        .required_skills
        .iter()
        .filter(|s| profile.skills.contains(s))
        .collect();
    let missing: Vec<String> = analysis
        .required_skills
        .iter()
        .filter(|s| !profile.skills.contains(*s))
        .take(5)
        .cloned()
        .collect();

    let mut technical_skills = profile.skills.clone();
    for skill in &missing {
        if !technical_skills.contains(skill) {
            technical_skills.push(skill.clone());
        }
    }

    let mut modifications = Vec::new();
    if !missing.is_empty() {
        modifications.push(format!(
            "added {} job-required skills to the skills section",
            missing.len()
        ));
    }

    let summary = if have.is_empty() {
        format!("Candidate for the {} role at {}.", analysis.title, analysis.company)
    } else {
        format!(
            "Candidate for the {} role at {}, experienced with {}.",
            analysis.title,
            analysis.company,
            have.iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )
    };

    TailoredResume {
        job_id: analysis.job_id.clone(),
        summary,
        technical_skills,
        keywords_added: missing,
        modifications,
        source: TailorSource::Heuristic,
    }
}
